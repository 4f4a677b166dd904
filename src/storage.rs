use crate::constants::{COMPRESSED_AREA, RESIZED_AREA, RESIZED_PREFIX, UPLOADS_AREA};
use crate::error::{Result, SqueezeError};
use crate::utils::unix_millis;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use uuid::Uuid;

/// One of the three disjoint places artifacts live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    Upload,
    Resized,
    Compressed,
}

impl StorageArea {
    pub fn all() -> [StorageArea; 3] {
        [StorageArea::Upload, StorageArea::Compressed, StorageArea::Resized]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageArea::Upload => "upload",
            StorageArea::Resized => "resized",
            StorageArea::Compressed => "compressed",
        }
    }

    /// URL prefix the artifact is served under
    pub fn url_prefix(&self) -> &'static str {
        match self {
            StorageArea::Upload => "./uploads/",
            StorageArea::Resized => "./resized/",
            StorageArea::Compressed => "./compressed/",
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Directories backing the storage areas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAreas {
    pub uploads: PathBuf,
    pub resized: PathBuf,
    pub compressed: PathBuf,
}

/// An uploaded file under its unique stored name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl StorageAreas {
    /// The default layout under one data directory
    pub fn under(root: &Path) -> Self {
        Self {
            uploads: root.join(UPLOADS_AREA),
            resized: root.join(RESIZED_AREA),
            compressed: root.join(COMPRESSED_AREA),
        }
    }

    pub fn path(&self, area: StorageArea) -> &Path {
        match area {
            StorageArea::Upload => &self.uploads,
            StorageArea::Resized => &self.resized,
            StorageArea::Compressed => &self.compressed,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for area in StorageArea::all() {
            let dir = self.path(area);
            fs::create_dir_all(dir)
                .map_err(|_| SqueezeError::DirectoryCreationFailed(dir.to_path_buf()))?;
        }
        Ok(())
    }

    /// Copies a submitted file into the upload area under a fresh unique name.
    ///
    /// Files over `max_file_size` are refused before anything is written.
    pub fn store_upload(&self, source: &Path, max_file_size: u64) -> Result<StoredUpload> {
        if !source.exists() {
            return Err(SqueezeError::FileNotFound(source.to_path_buf()));
        }

        let size = fs::metadata(source)?.len();
        if size > max_file_size {
            return Err(SqueezeError::FileTooLarge(size, max_file_size));
        }

        let original_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stored_name = unique_name(&original_name);
        let path = self.uploads.join(&stored_name);

        fs::copy(source, &path)?;
        debug!(original = %original_name, stored = %stored_name, "Stored upload");

        Ok(StoredUpload {
            original_name,
            stored_name,
            path,
            size,
        })
    }

    pub fn resized_path(&self, stored_name: &str) -> PathBuf {
        self.resized.join(resized_filename(stored_name))
    }
}

/// `{uuid}-{millis}{.ext}`, keeping the original extension
pub fn unique_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    format!(
        "{}-{}{}",
        Uuid::new_v4(),
        unix_millis(SystemTime::now()),
        extension
    )
}

pub fn resized_filename(stored_name: &str) -> String {
    format!("{}{}", RESIZED_PREFIX, stored_name)
}
