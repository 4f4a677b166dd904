use crate::classify::{classify, CompressionProfile, ImageMetadata};
use crate::error::Result;
use crate::formats::SourceFormat;
use crate::processing::target_format;
use crate::profiles::{select_config, EncoderConfig};
use crate::settings::UserOverrides;
use crate::utils::format_file_size;
use serde::Serialize;
use std::path::Path;

const PNG_CONVERT_HINT_BYTES: u64 = 1024 * 1024;
const LARGE_JPEG_HINT_BYTES: u64 = 5 * 1024 * 1024;
const LARGE_DIMENSION_HINT: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub format: Option<SourceFormat>,
    pub dimensions: Dimensions,
    pub size: u64,
    pub has_alpha: bool,
    pub profile: CompressionProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis: ImageAnalysis,
    pub recommended_config: EncoderConfig,
    pub suggestions: Vec<String>,
}

/// Classifies one image and reports the settings it would be compressed with
pub fn analyze_image(path: &Path) -> Result<AnalysisReport> {
    let metadata = ImageMetadata::read(path)?;
    let profile = classify(&metadata);
    let recommended_config = select_config(
        profile,
        target_format(metadata.format, false),
        &UserOverrides::default(),
        metadata.byte_size,
    );

    Ok(AnalysisReport {
        analysis: ImageAnalysis {
            format: metadata.format,
            dimensions: Dimensions {
                width: metadata.width,
                height: metadata.height,
            },
            size: metadata.byte_size,
            has_alpha: metadata.has_alpha,
            profile,
        },
        recommended_config,
        suggestions: compression_suggestions(&metadata, profile),
    })
}

pub fn compression_suggestions(metadata: &ImageMetadata, profile: CompressionProfile) -> Vec<String> {
    let mut suggestions = Vec::new();
    let is_png = metadata.format == Some(SourceFormat::Png);

    if is_png && !metadata.has_alpha && metadata.byte_size > PNG_CONVERT_HINT_BYTES {
        suggestions.push("Convert to JPEG for a better compression ratio".to_string());
    }

    if metadata.format == Some(SourceFormat::Jpeg) && metadata.byte_size > LARGE_JPEG_HINT_BYTES {
        suggestions.push("Large JPEG: lower the quality to 75-80".to_string());
    }

    if metadata.width > LARGE_DIMENSION_HINT || metadata.height > LARGE_DIMENSION_HINT {
        suggestions.push("Large dimensions: resize before compressing".to_string());
    }

    if is_png && profile == CompressionProfile::Graphics {
        suggestions.push("Icon-like image: enable palette optimization".to_string());
    }

    suggestions
}

pub fn print_report(path: &Path, report: &AnalysisReport) {
    let analysis = &report.analysis;

    println!("📊 Analyzing image: {:?}", path);
    println!("📋 Basic Information:");
    println!(
        "  🎭 Format: {}",
        analysis
            .format
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!(
        "  📏 Dimensions: {}x{} pixels",
        analysis.dimensions.width, analysis.dimensions.height
    );
    println!(
        "  📦 File size: {} bytes ({})",
        analysis.size,
        format_file_size(analysis.size)
    );
    println!("  🎨 Alpha channel: {}", if analysis.has_alpha { "yes" } else { "no" });
    println!("  🏷️  Profile: {}", analysis.profile);

    println!("\n⚙️  Recommended encoder settings:");
    match &report.recommended_config {
        EncoderConfig::Jpeg(jpeg) => {
            println!("  JPEG quality {}, progressive: {}", jpeg.quality, jpeg.progressive);
        }
        EncoderConfig::Png(png) => {
            println!(
                "  PNG palette: {}, quantizer range {}-{}, speed {}",
                png.palette, png.quality_min, png.quality_max, png.speed
            );
        }
        EncoderConfig::WebP(webp) => {
            println!("  WebP quality {}, effort {}", webp.quality, webp.effort);
        }
    }

    println!("\n💡 Compression Suggestions:");
    if report.suggestions.is_empty() {
        println!("  ✅ Nothing to suggest, defaults fit this image");
    }
    for suggestion in &report.suggestions {
        println!("  🎯 {}", suggestion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqueezeError;
    use image::DynamicImage;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    fn metadata(format: SourceFormat, width: u32, height: u32, has_alpha: bool, size: u64) -> ImageMetadata {
        ImageMetadata {
            format: Some(format),
            width,
            height,
            channels: if has_alpha { 4 } else { 3 },
            has_alpha,
            byte_size: size,
        }
    }

    #[test]
    fn test_opaque_large_png_suggests_jpeg() {
        let meta = metadata(SourceFormat::Png, 1000, 1000, false, 2 * MB);
        let suggestions = compression_suggestions(&meta, classify(&meta));
        assert!(suggestions.iter().any(|s| s.contains("JPEG")));
    }

    #[test]
    fn test_large_jpeg_suggests_lower_quality() {
        let meta = metadata(SourceFormat::Jpeg, 3000, 2000, false, 6 * MB);
        let suggestions = compression_suggestions(&meta, classify(&meta));
        assert!(suggestions.iter().any(|s| s.contains("75-80")));
        assert!(suggestions.iter().any(|s| s.contains("resize")));
    }

    #[test]
    fn test_small_graphic_suggests_palette() {
        let meta = metadata(SourceFormat::Png, 64, 64, true, 4_000);
        let suggestions = compression_suggestions(&meta, classify(&meta));
        assert_eq!(suggestions, vec!["Icon-like image: enable palette optimization"]);
    }

    #[test]
    fn test_small_webp_has_no_suggestions() {
        let meta = metadata(SourceFormat::WebP, 640, 480, false, 50_000);
        assert!(compression_suggestions(&meta, classify(&meta)).is_empty());
    }

    #[test]
    fn test_analyze_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logo.png");
        DynamicImage::new_rgba8(40, 20).save(&path).unwrap();

        let report = analyze_image(&path).unwrap();
        assert_eq!(report.analysis.profile, CompressionProfile::Graphics);
        assert_eq!(report.analysis.dimensions, Dimensions { width: 40, height: 20 });
        assert!(matches!(report.recommended_config, EncoderConfig::Png(_)));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["analysis"]["hasAlpha"], true);
        assert_eq!(json["recommendedConfig"]["format"], "png");
    }

    #[test]
    fn test_analyze_missing_file() {
        let result = analyze_image(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(SqueezeError::FileNotFound(_))));
    }
}
