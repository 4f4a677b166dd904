use crate::constants::{
    CLIENT_DEFAULT_QUALITY, DEFAULT_QUANTIZER_MAX, DEFAULT_QUANTIZER_MIN, DEFAULT_QUANTIZER_SPEED,
    DEFAULT_RESIZE_HEIGHT, DEFAULT_RESIZE_WIDTH, MAX_QUALITY, MAX_QUANTIZER_SPEED, MIN_QUALITY,
    MIN_QUANTIZER_SPEED, REQUEST_DEFAULT_QUALITY,
};
use crate::error::{Result, SqueezeError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the resize stage picks target dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ResizeMode {
    /// Leave dimensions untouched
    #[default]
    Keep,
    /// Explicit width x height
    Custom,
    /// Scale proportionally to a target width
    #[value(name = "maxWidth", alias = "max-width")]
    MaxWidth,
    /// Scale proportionally to a target height
    #[value(name = "maxHeight", alias = "max-height")]
    MaxHeight,
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResizeMode::Keep => "keep",
            ResizeMode::Custom => "custom",
            ResizeMode::MaxWidth => "maxWidth",
            ResizeMode::MaxHeight => "maxHeight",
        };
        write!(f, "{}", name)
    }
}

/// How a source image maps onto the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitStrategy {
    /// Crop to fill the box
    #[default]
    Cover,
    /// Letterbox inside the box
    Contain,
    /// Stretch to the box
    Fill,
}

/// The flat parameter set submitted with every batch.
///
/// Field names follow the wire format of the upload form, so a request body
/// deserialises straight into this type. Missing fields take the server-side
/// defaults; [`CompressionSettings::default`] is the client's starting point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default = "CompressionSettings::request_defaults")]
pub struct CompressionSettings {
    pub lossy: bool,
    pub pngquant_min: u8,
    pub pngquant_max: u8,
    pub pngquant_speed: u8,
    pub jpeg_quality: u8,
    pub webp_quality: u8,
    pub resize_mode: ResizeMode,
    pub resize_width: u32,
    pub resize_height: u32,
    pub skip_if_smaller: bool,
    pub fit: FitStrategy,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            lossy: true,
            jpeg_quality: CLIENT_DEFAULT_QUALITY,
            webp_quality: CLIENT_DEFAULT_QUALITY,
            ..Self::request_defaults()
        }
    }
}

impl CompressionSettings {
    /// Values the server assumes for fields a request leaves out
    pub fn request_defaults() -> Self {
        Self {
            lossy: false,
            pngquant_min: DEFAULT_QUANTIZER_MIN,
            pngquant_max: DEFAULT_QUANTIZER_MAX,
            pngquant_speed: DEFAULT_QUANTIZER_SPEED,
            jpeg_quality: REQUEST_DEFAULT_QUALITY,
            webp_quality: REQUEST_DEFAULT_QUALITY,
            resize_mode: ResizeMode::Keep,
            resize_width: DEFAULT_RESIZE_WIDTH,
            resize_height: DEFAULT_RESIZE_HEIGHT,
            skip_if_smaller: false,
            fit: FitStrategy::Cover,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for quality in [
            self.pngquant_min,
            self.pngquant_max,
            self.jpeg_quality,
            self.webp_quality,
        ] {
            if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
                return Err(SqueezeError::InvalidQuality(quality, MIN_QUALITY, MAX_QUALITY));
            }
        }

        if self.pngquant_min > self.pngquant_max {
            return Err(SqueezeError::InvalidQualityRange(
                self.pngquant_min,
                self.pngquant_max,
            ));
        }

        if !(MIN_QUANTIZER_SPEED..=MAX_QUANTIZER_SPEED).contains(&self.pngquant_speed) {
            return Err(SqueezeError::InvalidSpeed(self.pngquant_speed));
        }

        if self.resize_mode != ResizeMode::Keep
            && (self.resize_width == 0 || self.resize_height == 0)
        {
            return Err(SqueezeError::InvalidResizeDimensions(
                self.resize_width,
                self.resize_height,
            ));
        }

        Ok(())
    }

    /// Encoder-facing view of these settings
    pub fn overrides(&self) -> UserOverrides {
        UserOverrides {
            jpeg_quality: Some(self.jpeg_quality),
            webp_quality: Some(self.webp_quality),
            lossy: Some(self.lossy),
            quantizer_min: Some(self.pngquant_min),
            quantizer_max: Some(self.pngquant_max),
            quantizer_speed: Some(self.pngquant_speed),
        }
    }

    /// Resize-facing view of these settings
    pub fn resize_request(&self) -> ResizeRequest {
        ResizeRequest {
            mode: self.resize_mode,
            width: self.resize_width,
            height: self.resize_height,
            skip_if_smaller: self.skip_if_smaller,
            fit: self.fit,
        }
    }
}

/// User-supplied values that replace profile defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserOverrides {
    pub jpeg_quality: Option<u8>,
    pub webp_quality: Option<u8>,
    pub lossy: Option<bool>,
    pub quantizer_min: Option<u8>,
    pub quantizer_max: Option<u8>,
    pub quantizer_speed: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    pub mode: ResizeMode,
    pub width: u32,
    pub height: u32,
    pub skip_if_smaller: bool,
    pub fit: FitStrategy,
}

impl Default for ResizeRequest {
    fn default() -> Self {
        CompressionSettings::default().resize_request()
    }
}
