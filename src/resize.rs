use crate::error::{Result, SqueezeError};
use crate::formats::SourceFormat;
use crate::settings::{FitStrategy, ResizeMode, ResizeRequest};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageReader, Rgba, RgbaImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Quality for JPEG intermediates; the compression stage re-encodes them anyway
const INTERMEDIATE_JPEG_QUALITY: u8 = 95;

const OPAQUE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT_FILL: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// What the resize stage decided to do for one source size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Mode is `keep`; the stage does not run
    Bypass,
    /// Source already satisfies the bound
    Skip,
    Resize {
        width: u32,
        height: u32,
        fit: FitStrategy,
    },
}

/// A resized file written ahead of compression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Bypassed,
    Skipped,
    Resized(ResizedArtifact),
}

/// Works out target dimensions and fit for a source of `(width, height)`.
///
/// Proportional modes always letterbox so they cannot distort, whatever fit the
/// user picked.
pub fn plan_resize(request: &ResizeRequest, source: (u32, u32)) -> ResizePlan {
    let (src_width, src_height) = source;

    match request.mode {
        ResizeMode::Keep => ResizePlan::Bypass,
        ResizeMode::Custom => ResizePlan::Resize {
            width: request.width,
            height: request.height,
            fit: request.fit,
        },
        ResizeMode::MaxWidth => {
            if request.skip_if_smaller && src_width <= request.width {
                return ResizePlan::Skip;
            }
            ResizePlan::Resize {
                width: request.width,
                height: scale_dimension(src_height, request.width, src_width),
                fit: FitStrategy::Contain,
            }
        }
        ResizeMode::MaxHeight => {
            if request.skip_if_smaller && src_height <= request.height {
                return ResizePlan::Skip;
            }
            ResizePlan::Resize {
                width: scale_dimension(src_width, request.height, src_height),
                height: request.height,
                fit: FitStrategy::Contain,
            }
        }
    }
}

/// `value * numerator / denominator`, rounded, never below one pixel
fn scale_dimension(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return numerator.max(1);
    }
    let scaled = (value as f64 * numerator as f64 / denominator as f64).round();
    (scaled as u32).max(1)
}

/// Background used when letterboxing for the given encoding
pub fn contain_fill(target: SourceFormat) -> Rgba<u8> {
    if target.supports_alpha() {
        TRANSPARENT_FILL
    } else {
        OPAQUE_FILL
    }
}

/// Applies a plan to decoded pixels
pub fn apply_plan(img: &DynamicImage, plan: ResizePlan, target: SourceFormat) -> Option<DynamicImage> {
    let ResizePlan::Resize { width, height, fit } = plan else {
        return None;
    };

    let resized = match fit {
        FitStrategy::Cover => img.resize_to_fill(width, height, FilterType::Lanczos3),
        FitStrategy::Fill => img.resize_exact(width, height, FilterType::Lanczos3),
        FitStrategy::Contain => {
            let inner = img.resize(width, height, FilterType::Lanczos3);
            if inner.dimensions() == (width, height) {
                return Some(inner);
            }
            let mut canvas = RgbaImage::from_pixel(width, height, contain_fill(target));
            let x = (width.saturating_sub(inner.width())) / 2;
            let y = (height.saturating_sub(inner.height())) / 2;
            imageops::overlay(&mut canvas, &inner.to_rgba8(), x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
    };

    Some(resized)
}

/// Resize stage: reads `source`, writes the resized image to `dest` encoded as
/// `target`, and reports what happened. A skip is not an error.
pub fn resize_image(
    source: &Path,
    dest: &Path,
    request: &ResizeRequest,
    target: SourceFormat,
) -> Result<ResizeOutcome> {
    if request.mode == ResizeMode::Keep {
        return Ok(ResizeOutcome::Bypassed);
    }

    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    let (src_width, src_height) = img.dimensions();
    let plan = plan_resize(request, (src_width, src_height));

    let Some(resized) = apply_plan(&img, plan, target) else {
        debug!(
            width = src_width,
            height = src_height,
            mode = %request.mode,
            "Source already within bounds, skipping resize"
        );
        return Ok(ResizeOutcome::Skipped);
    };

    save_intermediate(&resized, dest, target)?;
    let size = fs::metadata(dest)?.len();

    info!(
        "Resized {}x{} -> {}x{}",
        src_width,
        src_height,
        resized.width(),
        resized.height()
    );

    Ok(ResizeOutcome::Resized(ResizedArtifact {
        path: dest.to_path_buf(),
        width: resized.width(),
        height: resized.height(),
        size,
    }))
}

fn save_intermediate(img: &DynamicImage, dest: &Path, target: SourceFormat) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|_| SqueezeError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }

    match target {
        SourceFormat::Jpeg => {
            let mut writer = BufWriter::new(File::create(dest)?);
            let encoder = JpegEncoder::new_with_quality(&mut writer, INTERMEDIATE_JPEG_QUALITY);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        SourceFormat::Bmp => {
            DynamicImage::ImageRgb8(img.to_rgb8()).save_with_format(dest, target.to_image_format())?;
        }
        SourceFormat::Png | SourceFormat::WebP => {
            // Opaque input stays opaque so the artifact classifies like its source
            let pixels = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            pixels.save_with_format(dest, target.to_image_format())?;
        }
    }

    Ok(())
}
