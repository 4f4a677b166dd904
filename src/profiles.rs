//! Encoder configuration selection.
//!
//! Each profile carries base encoder settings for the formats it is tuned for. A
//! lookup for a combination the table doesn't cover falls back to the photo
//! profile for that format, then to the photo JPEG settings, so selection always
//! yields a complete config.

use crate::classify::CompressionProfile;
use crate::constants::{
    DEFAULT_QUANTIZER_MAX, DEFAULT_QUANTIZER_MIN, DEFAULT_QUANTIZER_SPEED,
    LARGE_FILE_QUALITY_DECREMENT, LARGE_FILE_QUALITY_FLOOR, LARGE_FILE_THRESHOLD,
};
use crate::formats::SourceFormat;
use crate::settings::UserOverrides;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JpegConfig {
    pub quality: u8,
    pub progressive: bool,
    pub mozjpeg: bool,
    pub optimize_scans: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PngConfig {
    pub compression_level: u8,
    pub adaptive_filtering: bool,
    /// Palette quantization, i.e. lossy mode
    pub palette: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    pub quality_min: u8,
    pub quality_max: u8,
    pub speed: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpConfig {
    pub quality: u8,
    pub effort: u8,
    pub smart_subsample: bool,
    pub lossless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncoderConfig {
    Jpeg(JpegConfig),
    Png(PngConfig),
    #[serde(rename = "webp")]
    WebP(WebpConfig),
}

impl EncoderConfig {
    /// The encoding this config produces
    pub fn format(&self) -> SourceFormat {
        match self {
            EncoderConfig::Jpeg(_) => SourceFormat::Jpeg,
            EncoderConfig::Png(_) => SourceFormat::Png,
            EncoderConfig::WebP(_) => SourceFormat::WebP,
        }
    }

    pub fn quality(&self) -> Option<u8> {
        match self {
            EncoderConfig::Jpeg(config) => Some(config.quality),
            EncoderConfig::Png(config) => config.quality,
            EncoderConfig::WebP(config) => Some(config.quality),
        }
    }
}

const PHOTO_JPEG: JpegConfig = JpegConfig {
    quality: 85,
    progressive: true,
    mozjpeg: true,
    optimize_scans: true,
};

fn png_base(compression_level: u8, palette: bool, quality: Option<u8>) -> PngConfig {
    PngConfig {
        compression_level,
        adaptive_filtering: true,
        palette,
        quality,
        quality_min: DEFAULT_QUANTIZER_MIN,
        quality_max: DEFAULT_QUANTIZER_MAX,
        speed: DEFAULT_QUANTIZER_SPEED,
    }
}

/// Base config for one profile/format cell, `None` where the table has a gap
pub fn base_config(profile: CompressionProfile, format: SourceFormat) -> Option<EncoderConfig> {
    use CompressionProfile::*;

    let config = match (profile, format) {
        (Photo, SourceFormat::Jpeg) => EncoderConfig::Jpeg(PHOTO_JPEG),
        (Photo, SourceFormat::WebP) => EncoderConfig::WebP(WebpConfig {
            quality: 85,
            effort: 6,
            smart_subsample: true,
            lossless: false,
        }),
        (Graphics, SourceFormat::Png) => EncoderConfig::Png(png_base(9, true, Some(80))),
        (Graphics, SourceFormat::WebP) => EncoderConfig::WebP(WebpConfig {
            quality: 90,
            effort: 6,
            smart_subsample: false,
            lossless: false,
        }),
        (Screenshot, SourceFormat::Png) => EncoderConfig::Png(png_base(8, false, Some(75))),
        (Screenshot, SourceFormat::Jpeg) => EncoderConfig::Jpeg(JpegConfig {
            quality: 80,
            progressive: true,
            mozjpeg: true,
            optimize_scans: false,
        }),
        (HighQuality, SourceFormat::Jpeg) => EncoderConfig::Jpeg(JpegConfig {
            quality: 95,
            progressive: true,
            mozjpeg: true,
            optimize_scans: false,
        }),
        (HighQuality, SourceFormat::Png) => EncoderConfig::Png(png_base(9, false, None)),
        (HighQuality, SourceFormat::WebP) => EncoderConfig::WebP(WebpConfig {
            quality: 95,
            effort: 6,
            smart_subsample: false,
            lossless: false,
        }),
        _ => return None,
    };

    Some(config)
}

/// Resolves the encoder config for one file.
///
/// `format` is the target encoding, which differs from the source format when a
/// PNG is being converted to JPEG.
pub fn select_config(
    profile: CompressionProfile,
    format: SourceFormat,
    overrides: &UserOverrides,
    byte_size: u64,
) -> EncoderConfig {
    let mut config = base_config(profile, format)
        .or_else(|| base_config(CompressionProfile::Photo, format))
        .unwrap_or(EncoderConfig::Jpeg(PHOTO_JPEG));

    apply_overrides(&mut config, overrides);

    if byte_size > LARGE_FILE_THRESHOLD {
        lower_quality_for_large_file(&mut config);
    }

    config
}

fn apply_overrides(config: &mut EncoderConfig, overrides: &UserOverrides) {
    match config {
        EncoderConfig::Jpeg(jpeg) => {
            if let Some(quality) = overrides.jpeg_quality {
                jpeg.quality = quality;
            }
        }
        EncoderConfig::WebP(webp) => {
            if let Some(quality) = overrides.webp_quality {
                webp.quality = quality;
            }
        }
        EncoderConfig::Png(png) => {
            if let Some(lossy) = overrides.lossy {
                png.palette = lossy;
            }
            if let Some(min) = overrides.quantizer_min {
                png.quality_min = min;
            }
            if let Some(max) = overrides.quantizer_max {
                png.quality_max = max;
            }
            if let Some(speed) = overrides.quantizer_speed {
                png.speed = speed;
            }
        }
    }
}

fn lowered(quality: u8) -> u8 {
    quality
        .saturating_sub(LARGE_FILE_QUALITY_DECREMENT)
        .max(LARGE_FILE_QUALITY_FLOOR)
}

fn lower_quality_for_large_file(config: &mut EncoderConfig) {
    match config {
        EncoderConfig::Jpeg(jpeg) => jpeg.quality = lowered(jpeg.quality),
        EncoderConfig::WebP(webp) => webp.quality = lowered(webp.quality),
        EncoderConfig::Png(png) => png.quality = png.quality.map(lowered),
    }
}

/// One row of the read-only profile table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub profile: CompressionProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg: Option<EncoderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<EncoderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp: Option<EncoderConfig>,
}

pub fn profile_table() -> Vec<ProfileEntry> {
    CompressionProfile::all()
        .into_iter()
        .map(|profile| ProfileEntry {
            profile,
            jpeg: base_config(profile, SourceFormat::Jpeg),
            png: base_config(profile, SourceFormat::Png),
            webp: base_config(profile, SourceFormat::WebP),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_photo_jpeg_base() {
        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Jpeg,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(config, EncoderConfig::Jpeg(PHOTO_JPEG));
    }

    #[test]
    fn test_large_jpeg_quality_is_lowered() {
        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Jpeg,
            &UserOverrides::default(),
            12 * MB,
        );
        assert_eq!(config.quality(), Some(75));
    }

    #[test]
    fn test_large_file_adjustment_is_floor_clamped() {
        let overrides = UserOverrides {
            jpeg_quality: Some(65),
            ..UserOverrides::default()
        };
        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Jpeg,
            &overrides,
            12 * MB,
        );
        assert_eq!(config.quality(), Some(60));
    }

    #[test]
    fn test_adjustment_applies_after_overrides() {
        let overrides = UserOverrides {
            webp_quality: Some(70),
            ..UserOverrides::default()
        };
        let config = select_config(
            CompressionProfile::HighQuality,
            SourceFormat::WebP,
            &overrides,
            11 * MB,
        );
        assert_eq!(config.quality(), Some(60));
    }

    #[test]
    fn test_exactly_at_threshold_is_not_large() {
        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Jpeg,
            &UserOverrides::default(),
            LARGE_FILE_THRESHOLD,
        );
        assert_eq!(config.quality(), Some(85));
    }

    #[test]
    fn test_overrides_replace_png_fields() {
        let overrides = UserOverrides {
            lossy: Some(false),
            quantizer_min: Some(40),
            quantizer_max: Some(70),
            quantizer_speed: Some(5),
            jpeg_quality: Some(10),
            ..UserOverrides::default()
        };
        let config = select_config(
            CompressionProfile::Graphics,
            SourceFormat::Png,
            &overrides,
            MB,
        );
        match config {
            EncoderConfig::Png(png) => {
                assert!(!png.palette);
                assert_eq!((png.quality_min, png.quality_max, png.speed), (40, 70, 5));
                assert_eq!(png.compression_level, 9);
                assert_eq!(png.quality, Some(80));
            }
            other => panic!("expected PNG config, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_cell_falls_back_to_photo_for_format() {
        // graphics has no JPEG entry
        let config = select_config(
            CompressionProfile::Graphics,
            SourceFormat::Jpeg,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(config, EncoderConfig::Jpeg(PHOTO_JPEG));

        // screenshot has no WebP entry; photo does
        let config = select_config(
            CompressionProfile::Screenshot,
            SourceFormat::WebP,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(config.format(), SourceFormat::WebP);
        assert_eq!(config.quality(), Some(85));
    }

    #[test]
    fn test_unknown_format_falls_back_to_default_jpeg() {
        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Bmp,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(config, EncoderConfig::Jpeg(PHOTO_JPEG));

        let config = select_config(
            CompressionProfile::Photo,
            SourceFormat::Png,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(config, EncoderConfig::Jpeg(PHOTO_JPEG));
    }

    #[test]
    fn test_selection_does_not_leak_between_calls() {
        let overrides = UserOverrides {
            jpeg_quality: Some(30),
            ..UserOverrides::default()
        };
        select_config(CompressionProfile::Photo, SourceFormat::Jpeg, &overrides, MB);
        let fresh = select_config(
            CompressionProfile::Photo,
            SourceFormat::Jpeg,
            &UserOverrides::default(),
            MB,
        );
        assert_eq!(fresh.quality(), Some(85));
    }

    #[test]
    fn test_profile_table_shape() {
        let table = profile_table();
        assert_eq!(table.len(), 4);
        let graphics = &table[1];
        assert_eq!(graphics.profile, CompressionProfile::Graphics);
        assert!(graphics.jpeg.is_none());
        assert!(graphics.png.is_some());

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json[0]["jpeg"]["quality"], 85);
        assert_eq!(json[0]["jpeg"]["format"], "jpeg");
    }
}
