use crate::classify::CompressionProfile;
use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_QUANTIZER_TIMEOUT_SECS, DEFAULT_RETENTION_MS,
    DEFAULT_SWEEP_INTERVAL_MS, MAX_BATCH_FILES, MAX_FILE_SIZE, SUPPORTED_IMAGE_EXTENSIONS,
};
use crate::error::Result;
use crate::formats::SourceFormat;
use crate::profiles::{profile_table, select_config, EncoderConfig, ProfileEntry};
use crate::quantizer::Pngquant;
use crate::settings::UserOverrides;
use crate::storage::StorageAreas;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime service settings, taken from flags or the environment
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ServiceConfig {
    #[arg(
        long,
        env = "DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        help = "Root directory for the storage areas and the cache manifest"
    )]
    pub data_dir: PathBuf,

    #[arg(long, env = "UPLOADS_DIR", help = "Override the upload area directory")]
    pub uploads_dir: Option<PathBuf>,

    #[arg(long, env = "COMPRESSED_DIR", help = "Override the compressed area directory")]
    pub compressed_dir: Option<PathBuf>,

    #[arg(long, env = "RESIZED_DIR", help = "Override the resized area directory")]
    pub resized_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "MAX_FILE_SIZE",
        default_value_t = MAX_FILE_SIZE,
        help = "Largest accepted upload in bytes"
    )]
    pub max_file_size: u64,

    #[arg(
        long,
        env = "MAX_FILES",
        default_value_t = MAX_BATCH_FILES,
        help = "Most files accepted in one batch"
    )]
    pub max_files: usize,

    #[arg(
        long,
        env = "CLEANUP_INTERVAL",
        default_value_t = DEFAULT_SWEEP_INTERVAL_MS,
        help = "Milliseconds between periodic sweeps"
    )]
    pub cleanup_interval: u64,

    #[arg(
        long,
        env = "FILE_RETENTION_TIME",
        default_value_t = DEFAULT_RETENTION_MS,
        help = "Milliseconds an artifact is kept before it may be swept"
    )]
    pub file_retention_time: u64,

    #[arg(
        long,
        env = "PNGQUANT_PATH",
        help = "Path to the pngquant binary (default: search PATH)"
    )]
    pub pngquant_path: Option<PathBuf>,

    #[arg(
        long,
        env = "PNGQUANT_TIMEOUT",
        default_value_t = DEFAULT_QUANTIZER_TIMEOUT_SECS,
        help = "Seconds before a pngquant run is killed"
    )]
    pub pngquant_timeout: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            uploads_dir: None,
            compressed_dir: None,
            resized_dir: None,
            max_file_size: MAX_FILE_SIZE,
            max_files: MAX_BATCH_FILES,
            cleanup_interval: DEFAULT_SWEEP_INTERVAL_MS,
            file_retention_time: DEFAULT_RETENTION_MS,
            pngquant_path: None,
            pngquant_timeout: DEFAULT_QUANTIZER_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    /// Area directories: explicit overrides win over the data directory layout
    pub fn areas(&self) -> StorageAreas {
        let defaults = StorageAreas::under(&self.data_dir);
        StorageAreas {
            uploads: self.uploads_dir.clone().unwrap_or(defaults.uploads),
            resized: self.resized_dir.clone().unwrap_or(defaults.resized),
            compressed: self.compressed_dir.clone().unwrap_or(defaults.compressed),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.file_retention_time)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval)
    }

    pub fn quantizer(&self) -> Result<Pngquant> {
        let quantizer = match &self.pngquant_path {
            Some(path) => Pngquant::with_path(path),
            None => Pngquant::locate()?,
        };
        Ok(quantizer.with_timeout(Duration::from_secs(self.pngquant_timeout)))
    }

    pub fn introspection(&self) -> Introspection {
        Introspection {
            supported_formats: SUPPORTED_IMAGE_EXTENSIONS.to_vec(),
            max_file_size: format!("{}MB", round_div(self.max_file_size, 1024 * 1024)),
            max_files: self.max_files,
            file_retention_time: format!("{} minutes", round_div(self.file_retention_time, 60_000)),
            cleanup_interval: format!("{} minutes", round_div(self.cleanup_interval, 60_000)),
            compression_configs: CompressionConfigs::defaults(),
            profiles: CompressionProfile::all().to_vec(),
            profile_configs: profile_table(),
        }
    }
}

fn round_div(value: u64, unit: u64) -> u64 {
    (value + unit / 2) / unit
}

/// Default settings per output format; PNG shows the palette-quantized graphics cell
#[derive(Debug, Clone, Serialize)]
pub struct CompressionConfigs {
    pub jpeg: EncoderConfig,
    pub png: EncoderConfig,
    pub webp: EncoderConfig,
}

impl CompressionConfigs {
    fn defaults() -> Self {
        let config = |profile, format| select_config(profile, format, &UserOverrides::default(), 0);
        Self {
            jpeg: config(CompressionProfile::Photo, SourceFormat::Jpeg),
            png: config(CompressionProfile::Graphics, SourceFormat::Png),
            webp: config(CompressionProfile::Photo, SourceFormat::WebP),
        }
    }
}

/// The read-only document printed by `config`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Introspection {
    pub supported_formats: Vec<&'static str>,
    pub max_file_size: String,
    pub max_files: usize,
    pub file_retention_time: String,
    pub cleanup_interval: String,
    pub compression_configs: CompressionConfigs,
    pub profiles: Vec<CompressionProfile>,
    pub profile_configs: Vec<ProfileEntry>,
}
