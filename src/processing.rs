use crate::classify::{classify, CompressionProfile, ImageMetadata};
use crate::constants::COMPRESSED_PREFIX;
use crate::error::{Result, SqueezeError};
use crate::formats::SourceFormat;
use crate::profiles::{select_config, EncoderConfig, JpegConfig, WebpConfig};
use crate::quantizer::PngEncoder;
use crate::settings::{ResizeMode, UserOverrides};
use crate::utils::calculate_compression_ratio;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalInfo {
    pub filename: String,
    pub size: u64,
    pub dimensions: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedInfo {
    pub filename: String,
    pub size: u64,
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizedInfo {
    pub filename: String,
    pub size: u64,
    pub dimensions: String,
    pub resized_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSuccess {
    pub success: bool,
    pub converted_to_jpeg: bool,
    pub resize_mode: ResizeMode,
    pub profile: CompressionProfile,
    pub original: OriginalInfo,
    pub compressed: CompressedInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resized: Option<ResizedInfo>,
    pub download_url: String,
    pub original_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionFailure {
    pub success: bool,
    pub filename: String,
    pub error: String,
}

/// Per-file entry of a batch response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompressionResult {
    Success(Box<CompressionSuccess>),
    Failure(CompressionFailure),
}

impl CompressionResult {
    pub fn failure(filename: impl Into<String>, error: impl Into<String>) -> Self {
        CompressionResult::Failure(CompressionFailure {
            success: false,
            filename: filename.into(),
            error: error.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompressionResult::Success(_))
    }

    /// Name of the file as the user submitted it
    pub fn original_filename(&self) -> &str {
        match self {
            CompressionResult::Success(success) => &success.original.filename,
            CompressionResult::Failure(failure) => &failure.filename,
        }
    }
}

/// What the compression stage produced for one input
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub filename: String,
    pub path: PathBuf,
    pub input_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    pub profile: CompressionProfile,
    pub config: EncoderConfig,
    pub metadata: ImageMetadata,
}

/// Encoding the compression stage produces for a source.
///
/// Only PNG sources honour the conversion flag. Formats without an encoder of
/// their own are written as JPEG.
pub fn target_format(source: Option<SourceFormat>, convert_to_jpeg: bool) -> SourceFormat {
    match source {
        Some(SourceFormat::Png) if convert_to_jpeg => SourceFormat::Jpeg,
        Some(SourceFormat::Png) => SourceFormat::Png,
        Some(SourceFormat::WebP) => SourceFormat::WebP,
        Some(SourceFormat::Jpeg) | Some(SourceFormat::Bmp) | None => SourceFormat::Jpeg,
    }
}

/// `compressed-{stored}`, with the extension swapped when the encoding changed
pub fn compressed_filename(stored_name: &str, target: SourceFormat) -> String {
    format!("{}{}", COMPRESSED_PREFIX, with_target_extension(stored_name, target))
}

/// Keeps the stored extension when it already names `target`, so `.jpeg`
/// uploads stay `.jpeg`
pub fn with_target_extension(name: &str, target: SourceFormat) -> String {
    let path = Path::new(name);
    let keeps_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(SourceFormat::from_extension)
        == Some(target);

    if keeps_extension {
        name.to_string()
    } else {
        path.with_extension(target.extension())
            .to_string_lossy()
            .into_owned()
    }
}

/// Adaptive compression stage: classify, select encoder settings, encode
pub struct Compressor<E: PngEncoder> {
    png_encoder: E,
}

impl<E: PngEncoder> Compressor<E> {
    pub fn new(png_encoder: E) -> Self {
        Self { png_encoder }
    }

    pub fn png_encoder(&self) -> &E {
        &self.png_encoder
    }

    /// Compresses `input` into `output_dir`.
    ///
    /// `stored_name` is the unique upload name the output name derives from.
    /// The encoder config is chosen for the target encoding, so a PNG converted
    /// to JPEG gets JPEG settings.
    pub fn compress(
        &self,
        input: &Path,
        output_dir: &Path,
        stored_name: &str,
        convert_to_jpeg: bool,
        overrides: &UserOverrides,
    ) -> Result<CompressionOutcome> {
        let metadata = ImageMetadata::read(input)?;
        let profile = classify(&metadata);
        let target = target_format(metadata.format, convert_to_jpeg);
        let config = select_config(profile, target, overrides, metadata.byte_size);

        let filename = compressed_filename(stored_name, config.format());
        fs::create_dir_all(output_dir)
            .map_err(|_| SqueezeError::DirectoryCreationFailed(output_dir.to_path_buf()))?;
        let output = output_dir.join(&filename);

        debug!(
            profile = %profile,
            format = %config.format(),
            quality = ?config.quality(),
            "Selected encoder config"
        );

        match &config {
            EncoderConfig::Png(png) => {
                self.png_encoder.encode(input, &output, png)?;
                // pngquant skips writing when it cannot beat the input
                if !output.exists() {
                    return Err(SqueezeError::QuantizerNoOutput);
                }
            }
            EncoderConfig::Jpeg(jpeg) => encode_jpeg(&decode(input)?, &output, jpeg)?,
            EncoderConfig::WebP(webp) => encode_webp(&decode(input)?, &output, webp)?,
        }

        let compressed_size = fs::metadata(&output)?.len();
        let compression_ratio = calculate_compression_ratio(metadata.byte_size, compressed_size);

        info!(
            "Compressed {} as {} ({} -> {} bytes, {:.2}%)",
            stored_name, profile, metadata.byte_size, compressed_size, compression_ratio
        );

        Ok(CompressionOutcome {
            filename,
            path: output,
            input_size: metadata.byte_size,
            compressed_size,
            compression_ratio,
            profile,
            config,
            metadata,
        })
    }
}

fn decode(input: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(input)?.with_guessed_format()?.decode()?)
}

/// Composites any alpha channel onto white; JPEG has no transparency
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn encode_jpeg(img: &DynamicImage, output: &Path, config: &JpegConfig) -> Result<()> {
    let mut writer = BufWriter::new(File::create(output)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, config.quality);
    DynamicImage::ImageRgb8(flatten_onto_white(img)).write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}

pub fn encode_webp(img: &DynamicImage, output: &Path, config: &WebpConfig) -> Result<()> {
    let pixels = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let encoder = webp::Encoder::from_image(&pixels)
        .map_err(|e| SqueezeError::WebpEncoding(e.to_string()))?;

    let mut webp_config = webp::WebPConfig::new()
        .map_err(|_| SqueezeError::WebpEncoding("invalid encoder configuration".to_string()))?;
    webp_config.quality = config.quality as f32;
    webp_config.method = config.effort.min(6) as i32;
    webp_config.lossless = config.lossless as i32;
    webp_config.use_sharp_yuv = config.smart_subsample as i32;

    let encoded = encoder
        .encode_advanced(&webp_config)
        .map_err(|e| SqueezeError::WebpEncoding(format!("{:?}", e)))?;

    fs::write(output, &*encoded)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    struct CopyEncoder;

    impl PngEncoder for CopyEncoder {
        fn encode(&self, input: &Path, output: &Path, _config: &crate::profiles::PngConfig) -> Result<()> {
            fs::copy(input, output)?;
            Ok(())
        }
    }

    fn noisy_rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }))
    }

    #[test]
    fn test_target_format() {
        assert_eq!(target_format(Some(SourceFormat::Png), false), SourceFormat::Png);
        assert_eq!(target_format(Some(SourceFormat::Png), true), SourceFormat::Jpeg);
        assert_eq!(target_format(Some(SourceFormat::WebP), true), SourceFormat::WebP);
        assert_eq!(target_format(Some(SourceFormat::Jpeg), false), SourceFormat::Jpeg);
        assert_eq!(target_format(Some(SourceFormat::Bmp), false), SourceFormat::Jpeg);
        assert_eq!(target_format(None, false), SourceFormat::Jpeg);
    }

    #[test]
    fn test_compressed_filename() {
        assert_eq!(
            compressed_filename("abc-1.png", SourceFormat::Png),
            "compressed-abc-1.png"
        );
        assert_eq!(
            compressed_filename("abc-1.png", SourceFormat::Jpeg),
            "compressed-abc-1.jpg"
        );
        assert_eq!(
            compressed_filename("abc-1.jpeg", SourceFormat::Jpeg),
            "compressed-abc-1.jpeg"
        );
        assert_eq!(
            compressed_filename("abc-1.bmp", SourceFormat::Jpeg),
            "compressed-abc-1.jpg"
        );
    }

    #[test]
    fn test_flatten_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_compress_jpeg_uses_override_quality() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        noisy_rgb(64, 64).save(&input).unwrap();

        let compressor = Compressor::new(CopyEncoder);
        let overrides = UserOverrides {
            jpeg_quality: Some(40),
            ..UserOverrides::default()
        };
        let outcome = compressor
            .compress(&input, temp_dir.path(), "photo.jpg", false, &overrides)
            .unwrap();

        assert_eq!(outcome.profile, CompressionProfile::Photo);
        assert_eq!(outcome.config.quality(), Some(40));
        assert_eq!(outcome.filename, "compressed-photo.jpg");
        assert!(outcome.path.exists());
        assert_eq!(outcome.compressed_size, fs::metadata(&outcome.path).unwrap().len());
    }

    #[test]
    fn test_compress_png_goes_through_png_encoder() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("icon.png");
        DynamicImage::new_rgba8(32, 32).save(&input).unwrap();

        let compressor = Compressor::new(CopyEncoder);
        let outcome = compressor
            .compress(&input, temp_dir.path(), "icon.png", false, &UserOverrides::default())
            .unwrap();

        assert_eq!(outcome.profile, CompressionProfile::Graphics);
        assert!(matches!(outcome.config, EncoderConfig::Png(_)));
        // Copying leaves the size unchanged
        assert_eq!(outcome.compression_ratio, 0.0);
    }

    #[test]
    fn test_compress_webp() {
        let temp_dir = TempDir::new().unwrap();
        let source = noisy_rgb(48, 48);
        let webp_path = temp_dir.path().join("pic.webp");
        encode_webp(
            &source,
            &webp_path,
            &WebpConfig {
                quality: 100,
                effort: 4,
                smart_subsample: false,
                lossless: true,
            },
        )
        .unwrap();

        let compressor = Compressor::new(CopyEncoder);
        let outcome = compressor
            .compress(&webp_path, temp_dir.path(), "pic.webp", true, &UserOverrides::default())
            .unwrap();

        assert_eq!(outcome.profile, CompressionProfile::HighQuality);
        assert_eq!(outcome.filename, "compressed-pic.webp");
    }

    #[test]
    fn test_compress_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let compressor = Compressor::new(CopyEncoder);
        let result = compressor.compress(
            &temp_dir.path().join("missing.png"),
            temp_dir.path(),
            "missing.png",
            false,
            &UserOverrides::default(),
        );
        assert!(matches!(result, Err(SqueezeError::FileNotFound(_))));
    }

    #[test]
    fn test_result_wire_shape() {
        let failure = CompressionResult::failure("bad.png", "Image processing error: [file]");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["filename"], "bad.png");
        assert_eq!(failure.original_filename(), "bad.png");

        let parsed: CompressionResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, failure);
        assert!(!parsed.is_success());
    }
}
