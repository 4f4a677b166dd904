pub mod logger;

pub mod batch;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod info;
pub mod processing;
pub mod profiles;
pub mod quantizer;
pub mod resize;
pub mod sanitize;
pub mod scope;
pub mod settings;
pub mod storage;
pub mod sweeper;
pub mod utils;

pub use batch::{
    collect_image_files, merge_results, plan_batch, run_client_batch, BatchPlan, BatchProcessor,
    BatchRequest, BatchResponse, ClientReport, ClientResult, RunSummary,
};
pub use cache::{CacheIndex, FileFingerprint};
pub use classify::{classify, CompressionProfile, ImageMetadata};
pub use config::{Introspection, ServiceConfig};
pub use error::{Result, SqueezeError};
pub use formats::SourceFormat;
pub use info::{analyze_image, compression_suggestions, AnalysisReport};
pub use processing::{CompressionOutcome, CompressionResult, CompressionSuccess, Compressor};
pub use profiles::{select_config, EncoderConfig, JpegConfig, PngConfig, WebpConfig};
pub use quantizer::{PngEncoder, Pngquant};
pub use resize::{plan_resize, resize_image, ResizeOutcome, ResizePlan};
pub use sanitize::sanitize_error_message;
pub use scope::ParameterScope;
pub use settings::{CompressionSettings, FitStrategy, ResizeMode, ResizeRequest, UserOverrides};
pub use storage::{StorageArea, StorageAreas, StoredUpload};
pub use sweeper::{RetentionSweeper, SweepReport};
