use crate::config::ServiceConfig;
use crate::constants::{
    CLIENT_DEFAULT_QUALITY, DEFAULT_QUANTIZER_MAX, DEFAULT_QUANTIZER_MIN, DEFAULT_QUANTIZER_SPEED,
    DEFAULT_RESIZE_HEIGHT, DEFAULT_RESIZE_WIDTH,
};
use crate::settings::{CompressionSettings, FitStrategy, ResizeMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "adaptive-squeeze",
    about = "Adaptive batch image compression with settings-scoped result caching",
    long_about = "adaptive-squeeze classifies every image (photo, graphics, screenshot, high quality), \
                  picks encoder settings for it and compresses JPEG, PNG, WebP and BMP inputs in parallel. \
                  Results are cached per file and reused until a setting relevant to that file's format changes. \
                  Stored artifacts expire after a retention window.",
    version,
    after_help = "EXAMPLES:\n  \
    adaptive-squeeze batch ./photos -r --jpeg-quality 75\n  \
    adaptive-squeeze batch \"./shots/*.png\" --convert-to-jpeg banner.png --resize-mode maxWidth --resize-width 1280\n  \
    adaptive-squeeze analyze logo.png --json\n  \
    adaptive-squeeze sweep --watch\n  \
    adaptive-squeeze config"
)]
pub struct Args {
    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only print results and warnings"
    )]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Print debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Number of parallel threads (default: auto)",
        long_help = "Number of threads for parallel processing. \
                     If not specified, uses number of CPU cores."
    )]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress a batch of images, reusing cached results",
        long_about = "Collects images from a file, directory or glob, compresses the ones whose \
                      relevant settings changed since the last run and prints the merged results \
                      as JSON, in input order."
    )]
    Batch {
        #[arg(
            help = "Input file, directory, or glob",
            long_help = "Input can be a single file, a directory path, or a glob expression. \
                         Examples: './images', '*.jpg', '/path/to/images/*.png'"
        )]
        input: String,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively",
            long_help = "Recursively process all subdirectories when input is a directory."
        )]
        recursive: bool,

        #[command(flatten)]
        settings: SettingsArgs,

        #[arg(
            long = "convert-to-jpeg",
            value_name = "FILENAME",
            help = "Convert this PNG to JPEG (repeatable)",
            long_help = "File name of a PNG input that should be re-encoded as JPEG. \
                         May be given several times. Names refer to the input file name, not its path."
        )]
        convert_to_jpeg: Vec<String>,

        #[arg(
            long,
            help = "Ignore and overwrite the result cache",
            long_help = "Compress every file regardless of the cache. \
                         The cache manifest is still rewritten with the fresh results."
        )]
        no_cache: bool,

        #[command(flatten)]
        service: ServiceConfig,
    },

    #[command(
        about = "Delete expired artifacts from the storage areas",
        long_about = "Removes uploads, resized and compressed artifacts older than the retention window \
                      and prints a JSON report. With --watch, keeps sweeping every cleanup interval \
                      until interrupted."
    )]
    Sweep {
        #[arg(long, help = "Keep sweeping periodically until Ctrl-C")]
        watch: bool,

        #[command(flatten)]
        service: ServiceConfig,
    },

    #[command(
        about = "Print supported formats, limits and profile settings",
        long_about = "Prints the read-only configuration document as JSON: accepted formats, \
                      size and count limits, retention, and the encoder settings of every profile."
    )]
    Config {
        #[command(flatten)]
        service: ServiceConfig,
    },

    #[command(
        about = "Analyze an image and suggest compression settings",
        long_about = "Analyze an image file and display its format, dimensions, size, alpha channel, \
                      compression profile, the encoder settings it would get, and suggestions."
    )]
    Analyze {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
}

/// Per-batch compression parameters
#[derive(clap::Args, Debug, Clone)]
pub struct SettingsArgs {
    #[arg(
        long,
        help = "Keep PNGs lossless instead of palette-quantizing them",
        long_help = "Disable lossy PNG quantization. pngquant then runs with quality 100 \
                     and dithering off."
    )]
    pub lossless: bool,

    #[arg(
        long,
        default_value_t = DEFAULT_QUANTIZER_MIN,
        help = "Lowest acceptable pngquant quality (1-100)"
    )]
    pub pngquant_min: u8,

    #[arg(
        long,
        default_value_t = DEFAULT_QUANTIZER_MAX,
        help = "Target pngquant quality (1-100)"
    )]
    pub pngquant_max: u8,

    #[arg(
        long,
        default_value_t = DEFAULT_QUANTIZER_SPEED,
        help = "pngquant speed (1 slowest/best to 11 fastest)"
    )]
    pub pngquant_speed: u8,

    #[arg(
        long,
        default_value_t = CLIENT_DEFAULT_QUALITY,
        help = "JPEG quality (1-100)"
    )]
    pub jpeg_quality: u8,

    #[arg(
        long,
        default_value_t = CLIENT_DEFAULT_QUALITY,
        help = "WebP quality (1-100)"
    )]
    pub webp_quality: u8,

    #[arg(
        long,
        value_enum,
        default_value_t = ResizeMode::Keep,
        help = "Resize mode applied before compression",
        long_help = "keep: leave dimensions alone; custom: width x height with --fit; \
                     maxWidth / maxHeight: scale proportionally to one side."
    )]
    pub resize_mode: ResizeMode,

    #[arg(long, default_value_t = DEFAULT_RESIZE_WIDTH, help = "Resize target width in pixels")]
    pub resize_width: u32,

    #[arg(long, default_value_t = DEFAULT_RESIZE_HEIGHT, help = "Resize target height in pixels")]
    pub resize_height: u32,

    #[arg(
        long,
        help = "Do not resize images already within the target",
        long_help = "Leave an image untouched when it is not larger than the resize target."
    )]
    pub skip_if_smaller: bool,

    #[arg(
        long,
        value_enum,
        default_value_t = FitStrategy::Cover,
        help = "How custom resizes fit the box (cover, contain, fill)"
    )]
    pub fit: FitStrategy,
}

impl SettingsArgs {
    pub fn to_settings(&self) -> CompressionSettings {
        CompressionSettings {
            lossy: !self.lossless,
            pngquant_min: self.pngquant_min,
            pngquant_max: self.pngquant_max,
            pngquant_speed: self.pngquant_speed,
            jpeg_quality: self.jpeg_quality,
            webp_quality: self.webp_quality,
            resize_mode: self.resize_mode,
            resize_width: self.resize_width,
            resize_height: self.resize_height,
            skip_if_smaller: self.skip_if_smaller,
            fit: self.fit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_batch_defaults_match_client_settings() {
        let args = Args::try_parse_from(["adaptive-squeeze", "batch", "./images"]).unwrap();
        match args.command {
            Commands::Batch { settings, .. } => {
                assert_eq!(settings.to_settings(), CompressionSettings::default());
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_batch_flags() {
        let args = Args::try_parse_from([
            "adaptive-squeeze",
            "batch",
            "./images",
            "--lossless",
            "--resize-mode",
            "maxWidth",
            "--resize-width",
            "1280",
            "--fit",
            "contain",
            "--convert-to-jpeg",
            "a.png",
            "--convert-to-jpeg",
            "b.png",
        ])
        .unwrap();
        match args.command {
            Commands::Batch {
                settings,
                convert_to_jpeg,
                ..
            } => {
                let settings = settings.to_settings();
                assert!(!settings.lossy);
                assert_eq!(settings.resize_mode, ResizeMode::MaxWidth);
                assert_eq!(settings.resize_width, 1280);
                assert_eq!(settings.fit, FitStrategy::Contain);
                assert_eq!(convert_to_jpeg, vec!["a.png", "b.png"]);
            }
            _ => panic!("expected batch"),
        }
    }
}
