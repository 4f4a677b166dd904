use crate::constants::{GRAPHICS_BYTES_PER_PIXEL, GRAPHICS_MAX_PIXELS, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::{Result, SqueezeError};
use crate::formats::SourceFormat;
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Coarse content type driving the default encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompressionProfile {
    Photo,
    Graphics,
    Screenshot,
    HighQuality,
}

impl CompressionProfile {
    pub fn all() -> [CompressionProfile; 4] {
        [
            CompressionProfile::Photo,
            CompressionProfile::Graphics,
            CompressionProfile::Screenshot,
            CompressionProfile::HighQuality,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionProfile::Photo => "photo",
            CompressionProfile::Graphics => "graphics",
            CompressionProfile::Screenshot => "screenshot",
            CompressionProfile::HighQuality => "highQuality",
        }
    }
}

impl fmt::Display for CompressionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the classifier needs to know about an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// `None` when the decoder recognised a format the service does not handle
    pub format: Option<SourceFormat>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub has_alpha: bool,
    pub byte_size: u64,
}

impl ImageMetadata {
    /// Reads metadata from the file header without keeping the pixels around.
    ///
    /// The format comes from the file contents, not the extension, so a
    /// mislabelled upload is classified by what it really is.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqueezeError::FileNotFound(path.to_path_buf()));
        }

        let byte_size = fs::metadata(path)?.len();
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader.format().and_then(SourceFormat::from_image_format);
        let img = reader.decode()?;
        let color = img.color();

        Ok(Self {
            format,
            width: img.width(),
            height: img.height(),
            channels: color.channel_count(),
            has_alpha: color.has_alpha(),
            byte_size,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Encoded bytes per decoded pixel; zero for degenerate dimensions
    pub fn bytes_per_pixel(&self) -> f64 {
        match self.pixel_count() {
            0 => 0.0,
            pixels => self.byte_size as f64 / pixels as f64,
        }
    }

    pub fn dimensions_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Assigns a compression profile. First matching rule wins.
pub fn classify(metadata: &ImageMetadata) -> CompressionProfile {
    match metadata.format {
        Some(SourceFormat::Jpeg) => CompressionProfile::Photo,
        Some(SourceFormat::Png) => classify_png(metadata),
        Some(SourceFormat::WebP) => CompressionProfile::HighQuality,
        _ => CompressionProfile::Photo,
    }
}

fn classify_png(metadata: &ImageMetadata) -> CompressionProfile {
    if metadata.has_alpha {
        return CompressionProfile::Graphics;
    }

    // Dense, small images are icons and line art
    if metadata.bytes_per_pixel() > GRAPHICS_BYTES_PER_PIXEL
        && metadata.pixel_count() < GRAPHICS_MAX_PIXELS
    {
        return CompressionProfile::Graphics;
    }

    if metadata.width > SCREEN_WIDTH || metadata.height > SCREEN_HEIGHT {
        return CompressionProfile::Screenshot;
    }

    CompressionProfile::Graphics
}
