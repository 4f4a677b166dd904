//! Settings-scoped result cache for repeated batch runs.
//!
//! Each input file is identified by a [`FileFingerprint`] (name, size and
//! modification time). The index remembers the [`ParameterScope`] a file was
//! last compressed with along with the result it produced. On the next run a
//! file is resubmitted only when its current scope differs from the stored one,
//! so tweaking the JPEG quality leaves PNG results alone.
//!
//! The fingerprint is not a content hash: replacing a file with one that has
//! the same name, size and mtime reuses the old result. That is accepted in
//! exchange for never reading file contents during planning.
//!
//! The index is persisted as a versioned JSON manifest. A missing, corrupt or
//! outdated manifest loads as an empty index, which only costs a recompression.

use crate::constants::CACHE_MANIFEST_FILENAME;
use crate::error::{Result, SqueezeError};
use crate::processing::CompressionResult;
use crate::scope::ParameterScope;
use crate::utils::unix_millis;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Bump to discard manifests written by an incompatible version
const MANIFEST_VERSION: u32 = 1;

/// Cache identity of an input file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFingerprint {
    pub name: String,
    pub size: u64,
    pub modified_ms: u64,
}

impl FileFingerprint {
    pub fn new(name: impl Into<String>, size: u64, modified_ms: u64) -> Self {
        Self {
            name: name.into(),
            size,
            modified_ms,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SqueezeError::FileNotFound(path.to_path_buf()),
            _ => SqueezeError::Io(e),
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, metadata.len(), unix_millis(metadata.modified()?)))
    }

    /// `name-size-modified`, the id shown to users
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.name, self.size, self.modified_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub scope: ParameterScope,
    pub result: CompressionResult,
}

#[derive(Serialize, Deserialize)]
struct ManifestRecord {
    fingerprint: FileFingerprint,
    #[serde(flatten)]
    entry: CacheEntry,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u32,
    entries: Vec<ManifestRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheIndex {
    entries: HashMap<FileFingerprint, CacheEntry>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the manifest from `dir`, or an empty index if there is none
    pub fn load(dir: &Path) -> Self {
        Self::load_from(&dir.join(CACHE_MANIFEST_FILENAME))
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::new(),
        };

        let manifest: Manifest = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Ignoring unreadable cache manifest {}: {}", path.display(), e);
                return Self::new();
            }
        };

        if manifest.version != MANIFEST_VERSION {
            debug!(
                found = manifest.version,
                expected = MANIFEST_VERSION,
                "Discarding cache manifest from another version"
            );
            return Self::new();
        }

        let entries = manifest
            .entries
            .into_iter()
            .map(|record| (record.fingerprint, record.entry))
            .collect();

        Self { entries }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.save_to(&dir.join(CACHE_MANIFEST_FILENAME))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut entries: Vec<ManifestRecord> = self
            .entries
            .iter()
            .map(|(fingerprint, entry)| ManifestRecord {
                fingerprint: fingerprint.clone(),
                entry: entry.clone(),
            })
            .collect();
        // Stable output keeps the manifest diffable
        entries.sort_by(|a, b| a.fingerprint.id().cmp(&b.fingerprint.id()));

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            entries,
        };
        fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(())
    }

    /// A file is stale when it has no entry or was compressed under another scope
    pub fn is_stale(&self, fingerprint: &FileFingerprint, scope: &ParameterScope) -> bool {
        self.entries
            .get(fingerprint)
            .map_or(true, |entry| entry.scope != *scope)
    }

    /// The cached result, only if it is still valid for `scope`
    pub fn lookup(
        &self,
        fingerprint: &FileFingerprint,
        scope: &ParameterScope,
    ) -> Option<&CompressionResult> {
        self.entries
            .get(fingerprint)
            .filter(|entry| entry.scope == *scope)
            .map(|entry| &entry.result)
    }

    pub fn get(&self, fingerprint: &FileFingerprint) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    /// Stores a fresh result, replacing whatever was there
    pub fn record(
        &mut self,
        fingerprint: FileFingerprint,
        scope: ParameterScope,
        result: CompressionResult,
    ) {
        self.entries.insert(fingerprint, CacheEntry { scope, result });
    }

    pub fn remove(&mut self, fingerprint: &FileFingerprint) -> Option<CacheEntry> {
        self.entries.remove(fingerprint)
    }

    /// Drops entries for files no longer in the working set; returns how many
    pub fn retain_files(&mut self, working_set: &HashSet<FileFingerprint>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|fingerprint, _| working_set.contains(fingerprint));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::SourceFormat;
    use crate::settings::CompressionSettings;
    use tempfile::TempDir;

    fn fingerprint(name: &str) -> FileFingerprint {
        FileFingerprint::new(name, 1024, 1_700_000_000_000)
    }

    fn png_scope(settings: &CompressionSettings, convert: bool) -> ParameterScope {
        ParameterScope::for_file(Some(SourceFormat::Png), settings, convert)
    }

    #[test]
    fn test_missing_entry_is_stale() {
        let index = CacheIndex::new();
        let scope = png_scope(&CompressionSettings::default(), false);
        assert!(index.is_stale(&fingerprint("a.png"), &scope));
        assert!(index.lookup(&fingerprint("a.png"), &scope).is_none());
    }

    #[test]
    fn test_same_scope_is_fresh() {
        let mut index = CacheIndex::new();
        let settings = CompressionSettings::default();
        let scope = png_scope(&settings, false);
        let result = CompressionResult::failure("a.png", "boom");
        index.record(fingerprint("a.png"), scope, result.clone());

        assert!(!index.is_stale(&fingerprint("a.png"), &scope));
        assert_eq!(index.lookup(&fingerprint("a.png"), &scope), Some(&result));
    }

    #[test]
    fn test_irrelevant_change_keeps_png_fresh() {
        let mut index = CacheIndex::new();
        let settings = CompressionSettings::default();
        index.record(
            fingerprint("a.png"),
            png_scope(&settings, false),
            CompressionResult::failure("a.png", "x"),
        );

        let tweaked = CompressionSettings {
            jpeg_quality: 95,
            ..settings.clone()
        };
        assert!(!index.is_stale(&fingerprint("a.png"), &png_scope(&tweaked, false)));

        let lossless = CompressionSettings {
            lossy: false,
            ..settings
        };
        assert!(index.is_stale(&fingerprint("a.png"), &png_scope(&lossless, false)));
    }

    #[test]
    fn test_changed_file_is_a_different_key() {
        let mut index = CacheIndex::new();
        let scope = png_scope(&CompressionSettings::default(), false);
        index.record(fingerprint("a.png"), scope, CompressionResult::failure("a.png", "x"));

        let touched = FileFingerprint::new("a.png", 1024, 1_700_000_000_001);
        assert!(index.is_stale(&touched, &scope));
    }

    #[test]
    fn test_retain_files_prunes_departed() {
        let mut index = CacheIndex::new();
        let scope = png_scope(&CompressionSettings::default(), false);
        for name in ["a.png", "b.png", "c.png"] {
            index.record(fingerprint(name), scope, CompressionResult::failure(name, "x"));
        }

        let working_set: HashSet<_> = [fingerprint("b.png")].into_iter().collect();
        assert_eq!(index.retain_files(&working_set), 2);
        assert_eq!(index.len(), 1);
        assert!(index.get(&fingerprint("b.png")).is_some());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = CacheIndex::new();
        let scope = png_scope(&CompressionSettings::default(), true);
        index.record(fingerprint("a.png"), scope, CompressionResult::failure("a.png", "x"));
        index.save(temp_dir.path()).unwrap();

        let loaded = CacheIndex::load(temp_dir.path());
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_corrupt_manifest_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CACHE_MANIFEST_FILENAME), "{not json").unwrap();
        assert!(CacheIndex::load(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_other_version_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CACHE_MANIFEST_FILENAME),
            r#"{"version": 999, "entries": []}"#,
        )
        .unwrap();
        assert!(CacheIndex::load(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_fingerprint_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pic.png");
        fs::write(&path, b"12345").unwrap();

        let fp = FileFingerprint::from_path(&path).unwrap();
        assert_eq!(fp.name, "pic.png");
        assert_eq!(fp.size, 5);
        assert!(fp.id().starts_with("pic.png-5-"));

        assert!(matches!(
            FileFingerprint::from_path(&temp_dir.path().join("gone.png")),
            Err(SqueezeError::FileNotFound(_))
        ));
    }
}
