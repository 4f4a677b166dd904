//! Image format handling for the formats the service accepts.
//!
//! Uploads are identified by extension or MIME type before decoding, and by the
//! decoder's own guess once the bytes are read. Everything downstream (scoping,
//! classification, encoder selection) works on [`SourceFormat`].

use crate::error::{Result, SqueezeError};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Image formats accepted for compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Bmp,
}

impl SourceFormat {
    /// Returns the canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpg",
            SourceFormat::Png => "png",
            SourceFormat::WebP => "webp",
            SourceFormat::Bmp => "bmp",
        }
    }

    /// Lowercase name used in result payloads (`jpeg`, `png`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::WebP => "webp",
            SourceFormat::Bmp => "bmp",
        }
    }

    /// Whether the encoding can carry transparency
    pub fn supports_alpha(&self) -> bool {
        matches!(self, SourceFormat::Png | SourceFormat::WebP)
    }

    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::WebP => ImageFormat::WebP,
            SourceFormat::Bmp => ImageFormat::Bmp,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            ImageFormat::Png => Some(SourceFormat::Png),
            ImageFormat::WebP => Some(SourceFormat::WebP),
            ImageFormat::Bmp => Some(SourceFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(SourceFormat::Jpeg),
            "png" => Some(SourceFormat::Png),
            "webp" => Some(SourceFormat::WebP),
            "bmp" => Some(SourceFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn all_formats() -> Vec<SourceFormat> {
        vec![
            SourceFormat::Jpeg,
            SourceFormat::Png,
            SourceFormat::Bmp,
            SourceFormat::WebP,
        ]
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::WebP => "WebP",
            SourceFormat::Bmp => "BMP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SourceFormat {
    type Err = SqueezeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| SqueezeError::UnsupportedFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_str() {
        assert_eq!(SourceFormat::from_str("jpeg").unwrap(), SourceFormat::Jpeg);
        assert_eq!(SourceFormat::from_str("JPG").unwrap(), SourceFormat::Jpeg);
        assert_eq!(SourceFormat::from_str("png").unwrap(), SourceFormat::Png);
        assert_eq!(SourceFormat::from_str("webp").unwrap(), SourceFormat::WebP);
        assert_eq!(SourceFormat::from_str("bmp").unwrap(), SourceFormat::Bmp);

        assert!(matches!(
            SourceFormat::from_str("gif"),
            Err(SqueezeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("a.PNG")), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_path(Path::new("b.jpeg")), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_path(Path::new("c")), None);
    }

    #[test]
    fn test_alpha_support() {
        assert!(SourceFormat::Png.supports_alpha());
        assert!(SourceFormat::WebP.supports_alpha());
        assert!(!SourceFormat::Jpeg.supports_alpha());
        assert!(!SourceFormat::Bmp.supports_alpha());
    }

    #[test]
    fn test_display_and_extension() {
        assert_eq!(format!("{}", SourceFormat::WebP), "WebP");
        assert_eq!(SourceFormat::Jpeg.extension(), "jpg");
        assert_eq!(SourceFormat::Jpeg.name(), "jpeg");
    }
}
