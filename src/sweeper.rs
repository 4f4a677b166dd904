//! Time-based retention for stored artifacts.
//!
//! Every area is swept independently of request handling. An entry is removed
//! once its modification time is further in the past than the retention window;
//! the `.gitkeep` placeholder always survives. Sweeps are idempotent and safe to
//! run concurrently: an entry that vanished between listing and deletion was
//! simply swept by someone else.

use crate::constants::PLACEHOLDER_ENTRY;
use crate::storage::{StorageArea, StorageAreas};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedArtifact {
    #[serde(rename = "type")]
    pub area: StorageArea,
    pub filename: String,
    /// Age at deletion, rounded to whole minutes
    #[serde(rename = "age")]
    pub age_minutes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted_count: usize,
    pub deleted: Vec<DeletedArtifact>,
}

/// Body returned by a manually triggered sweep
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    pub deleted_count: usize,
    pub deleted_files: Vec<DeletedArtifact>,
    pub message: String,
}

impl SweepReport {
    pub fn to_response(&self) -> SweepResponse {
        SweepResponse {
            success: true,
            deleted_count: self.deleted_count,
            deleted_files: self.deleted.clone(),
            message: format!(
                "Cleanup complete, deleted {} expired files",
                self.deleted_count
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    areas: Vec<(StorageArea, PathBuf)>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(areas: &StorageAreas, retention: Duration) -> Self {
        Self {
            areas: StorageArea::all()
                .into_iter()
                .map(|area| (area, areas.path(area).to_path_buf()))
                .collect(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now())
    }

    /// Sweeps as if the current time were `now`
    pub fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        for (area, dir) in &self.areas {
            self.sweep_area(*area, dir, now, &mut report);
        }

        if report.deleted_count > 0 {
            info!("Cleanup complete, deleted {} expired files", report.deleted_count);
        } else {
            debug!("Cleanup complete, nothing expired");
        }

        report
    }

    fn sweep_area(&self, area: StorageArea, dir: &Path, now: SystemTime, report: &mut SweepReport) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Cannot list {} area {}: {}", area, dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename == PLACEHOLDER_ENTRY {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Cannot stat {}: {}", filename, e);
                    continue;
                }
            };

            // Timestamps in the future count as brand new
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            let path = entry.path();
            let removal = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match removal {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Cannot delete {}: {}", filename, e);
                    continue;
                }
            }

            let age_minutes = (age.as_secs_f64() / 60.0).round() as u64;
            debug!(area = %area, file = %filename, age_minutes, "Deleted expired artifact");

            report.deleted_count += 1;
            report.deleted.push(DeletedArtifact {
                area,
                filename,
                age_minutes,
            });
        }
    }

    /// Sweeps every `interval` until the future is dropped.
    ///
    /// Each sweep runs on the blocking pool so filesystem work never stalls
    /// the async workers.
    pub async fn run_periodic(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; the first sweep waits a full interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let sweeper = self.clone();
            match tokio::task::spawn_blocking(move || sweeper.sweep()).await {
                Ok(report) => debug!(deleted = report.deleted_count, "Periodic sweep finished"),
                Err(e) => warn!("Periodic sweep panicked: {}", e),
            }
        }
    }
}
