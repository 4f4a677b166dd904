//! PNG quantization through the external `pngquant` tool.
//!
//! The compression stage only sees the [`PngEncoder`] trait; [`Pngquant`] is the
//! production implementation and tests substitute their own.

use crate::constants::{DEFAULT_QUANTIZER_TIMEOUT_SECS, QUANTIZER_BINARY, QUANTIZER_CANDIDATE_PATHS};
use crate::error::{Result, SqueezeError};
use crate::profiles::PngConfig;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Encodes a PNG file into another PNG file
pub trait PngEncoder: Send + Sync {
    fn encode(&self, input: &Path, output: &Path, config: &PngConfig) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Pngquant {
    path: PathBuf,
    timeout: Duration,
}

impl Pngquant {
    /// Finds the binary on `PATH`, then in the usual install locations
    pub fn locate() -> Result<Self> {
        if let Ok(path) = which::which(QUANTIZER_BINARY) {
            return Ok(Self::with_path(path));
        }

        QUANTIZER_CANDIDATE_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
            .map(Self::with_path)
            .ok_or(SqueezeError::QuantizerNotFound)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: Duration::from_secs(DEFAULT_QUANTIZER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command line for one run, excluding the binary itself.
    ///
    /// Lossless mode pins quality to 100 and disables dithering instead of
    /// passing the configured range.
    pub fn build_args(config: &PngConfig, input: &Path, output: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(9);

        if config.palette {
            args.push(format!("--quality={}-{}", config.quality_min, config.quality_max));
        } else {
            args.push("--quality=100".to_string());
        }
        args.push(format!("--speed={}", config.speed));
        if !config.palette {
            args.push("--nofs".to_string());
        }
        args.push("--strip".to_string());
        args.push("--force".to_string());
        args.push("--output".to_string());
        args.push(output.to_string_lossy().into_owned());
        args.push(input.to_string_lossy().into_owned());

        args
    }

    /// Runs `pngquant --version`; used to report the tool at startup
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|_| SqueezeError::QuantizerNotFound)?;

        if !output.status.success() {
            return Err(SqueezeError::QuantizerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<std::process::ExitStatus> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= self.timeout {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill pngquant after timeout: {}", e);
                }
                // Reap so the process doesn't linger as a zombie
                let _ = child.wait();
                return Err(SqueezeError::QuantizerTimeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl PngEncoder for Pngquant {
    fn encode(&self, input: &Path, output: &Path, config: &PngConfig) -> Result<()> {
        let args = Self::build_args(config, input, output);
        debug!(binary = %self.path.display(), ?args, "Running pngquant");

        let mut child = Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SqueezeError::QuantizerNotFound,
                _ => SqueezeError::Io(e),
            })?;

        // Drain stderr off-thread so a chatty child can't fill the pipe and stall
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = self.wait_with_timeout(&mut child)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(SqueezeError::QuantizerFailed {
                status: status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| status.to_string()),
                stderr: stderr.trim().to_string(),
            });
        }

        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "pngquant diagnostics");
        }
        debug!(output = %output.display(), written = output.exists(), "pngquant finished");

        Ok(())
    }
}

/// Per-platform hints for getting the tool installed
pub fn install_instructions() -> &'static [(&'static str, &'static str)] {
    &[
        ("macOS", "brew install pngquant"),
        ("ubuntu", "sudo apt-get install pngquant"),
        ("centos", "sudo yum install pngquant"),
        ("windows", "download pngquant-windows.zip and extract it into a PATH directory"),
        ("docker", "RUN apt-get update && apt-get install -y pngquant"),
    ]
}
