//! Format-scoped parameter snapshots.
//!
//! A [`ParameterScope`] is the subset of [`CompressionSettings`] that can change the
//! output for one particular file. Comparing the scope a file was last compressed with
//! against the current one tells the client whether a cached result is still valid.
//!
//! Scoping by format keeps unrelated knobs from invalidating results: moving the JPEG
//! quality slider leaves every PNG result cached. The one cross-cutting case is a PNG
//! that is being converted to JPEG, whose scope pulls in the JPEG quality.

use crate::formats::SourceFormat;
use crate::settings::{CompressionSettings, FitStrategy, ResizeMode};
use serde::{Deserialize, Serialize};

/// Resize knobs shared by every format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeScope {
    pub resize_mode: ResizeMode,
    pub resize_width: u32,
    pub resize_height: u32,
    pub skip_if_smaller: bool,
    pub fit: FitStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PngScope {
    pub lossy: bool,
    pub pngquant_min: u8,
    pub pngquant_max: u8,
    pub pngquant_speed: u8,
    pub convert_to_jpeg: bool,
    /// Only present while the file is being converted to JPEG
    pub jpeg_quality: Option<u8>,
    #[serde(flatten)]
    pub resize: ResizeScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JpegScope {
    pub jpeg_quality: u8,
    #[serde(flatten)]
    pub resize: ResizeScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpScope {
    pub webp_quality: u8,
    #[serde(flatten)]
    pub resize: ResizeScope,
}

/// Formats without a dedicated scope depend on everything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullScope {
    pub lossy: bool,
    pub pngquant_min: u8,
    pub pngquant_max: u8,
    pub pngquant_speed: u8,
    pub jpeg_quality: u8,
    pub webp_quality: u8,
    #[serde(flatten)]
    pub resize: ResizeScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ParameterScope {
    Png(PngScope),
    Jpeg(JpegScope),
    #[serde(rename = "webp")]
    WebP(WebpScope),
    Other(FullScope),
}

impl ParameterScope {
    /// Builds the scope for one file.
    ///
    /// `convert_to_jpeg` is the per-file override; it only has meaning for PNG
    /// sources and is ignored for every other format.
    pub fn for_file(
        format: Option<SourceFormat>,
        settings: &CompressionSettings,
        convert_to_jpeg: bool,
    ) -> Self {
        let resize = ResizeScope {
            resize_mode: settings.resize_mode,
            resize_width: settings.resize_width,
            resize_height: settings.resize_height,
            skip_if_smaller: settings.skip_if_smaller,
            fit: settings.fit,
        };

        match format {
            Some(SourceFormat::Png) => ParameterScope::Png(PngScope {
                lossy: settings.lossy,
                pngquant_min: settings.pngquant_min,
                pngquant_max: settings.pngquant_max,
                pngquant_speed: settings.pngquant_speed,
                convert_to_jpeg,
                jpeg_quality: convert_to_jpeg.then_some(settings.jpeg_quality),
                resize,
            }),
            Some(SourceFormat::Jpeg) => ParameterScope::Jpeg(JpegScope {
                jpeg_quality: settings.jpeg_quality,
                resize,
            }),
            Some(SourceFormat::WebP) => ParameterScope::WebP(WebpScope {
                webp_quality: settings.webp_quality,
                resize,
            }),
            Some(SourceFormat::Bmp) | None => ParameterScope::Other(FullScope {
                lossy: settings.lossy,
                pngquant_min: settings.pngquant_min,
                pngquant_max: settings.pngquant_max,
                pngquant_speed: settings.pngquant_speed,
                jpeg_quality: settings.jpeg_quality,
                webp_quality: settings.webp_quality,
                resize,
            }),
        }
    }

    pub fn resize(&self) -> &ResizeScope {
        match self {
            ParameterScope::Png(scope) => &scope.resize,
            ParameterScope::Jpeg(scope) => &scope.resize,
            ParameterScope::WebP(scope) => &scope.resize,
            ParameterScope::Other(scope) => &scope.resize,
        }
    }

    pub fn converts_to_jpeg(&self) -> bool {
        matches!(self, ParameterScope::Png(scope) if scope.convert_to_jpeg)
    }
}
