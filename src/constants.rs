pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

pub const DEFAULT_QUANTIZER_MIN: u8 = 60;
pub const DEFAULT_QUANTIZER_MAX: u8 = 80;
pub const DEFAULT_QUANTIZER_SPEED: u8 = 3;
pub const MIN_QUANTIZER_SPEED: u8 = 1;
pub const MAX_QUANTIZER_SPEED: u8 = 11;

/// Quality the server assumes when a request omits the JPEG/WebP knobs.
pub const REQUEST_DEFAULT_QUALITY: u8 = 80;
/// Quality the client starts from before the user touches the sliders.
pub const CLIENT_DEFAULT_QUALITY: u8 = 60;

pub const DEFAULT_RESIZE_WIDTH: u32 = 300;
pub const DEFAULT_RESIZE_HEIGHT: u32 = 200;

// Large-file adjustment applied after user overrides
pub const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;
pub const LARGE_FILE_QUALITY_DECREMENT: u8 = 10;
pub const LARGE_FILE_QUALITY_FLOOR: u8 = 60;

// Classifier thresholds
pub const GRAPHICS_BYTES_PER_PIXEL: f64 = 3.0;
pub const GRAPHICS_MAX_PIXELS: u64 = 500_000;
pub const SCREEN_WIDTH: u32 = 1920;
pub const SCREEN_HEIGHT: u32 = 1080;

// Service limits and timers
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_BATCH_FILES: usize = 100;
pub const DEFAULT_RETENTION_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_QUANTIZER_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const UPLOADS_AREA: &str = "uploads";
pub const RESIZED_AREA: &str = "resized";
pub const COMPRESSED_AREA: &str = "compressed";
pub const PLACEHOLDER_ENTRY: &str = ".gitkeep";
pub const CACHE_MANIFEST_FILENAME: &str = ".squeeze-cache.json";

pub const COMPRESSED_PREFIX: &str = "compressed-";
pub const RESIZED_PREFIX: &str = "resized-";

pub const QUANTIZER_BINARY: &str = "pngquant";
pub const QUANTIZER_CANDIDATE_PATHS: &[&str] = &[
    "/usr/local/bin/pngquant",
    "/usr/bin/pngquant",
    "/opt/homebrew/bin/pngquant",
];

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
