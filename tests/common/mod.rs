#![allow(dead_code)]

use adaptive_squeeze::error::Result;
use adaptive_squeeze::profiles::PngConfig;
use adaptive_squeeze::quantizer::{PngEncoder, Pngquant};
use adaptive_squeeze::storage::StorageAreas;
use adaptive_squeeze::{BatchProcessor, Compressor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// What a [`RecordingEncoder`] does with its output path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncoderBehavior {
    /// Writes the first half of the input bytes
    #[default]
    HalveInput,
    /// Succeeds without writing anything, like pngquant skipping a larger result
    WriteNothing,
}

/// Stands in for pngquant: records each command line, then acts per its behavior
#[derive(Clone, Default)]
pub struct RecordingEncoder {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    behavior: EncoderBehavior,
}

impl RecordingEncoder {
    pub fn writing_nothing() -> Self {
        Self {
            behavior: EncoderBehavior::WriteNothing,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PngEncoder for RecordingEncoder {
    fn encode(&self, input: &Path, output: &Path, config: &PngConfig) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Pngquant::build_args(config, input, output));
        if self.behavior == EncoderBehavior::HalveInput {
            let bytes = fs::read(input)?;
            fs::write(output, &bytes[..bytes.len() / 2])?;
        }
        Ok(())
    }
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn processor<E: PngEncoder>(root: &Path, encoder: E) -> BatchProcessor<E> {
    BatchProcessor::new(Compressor::new(encoder), StorageAreas::under(root), 100)
}

pub fn noisy_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

pub fn noisy_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 7 % 256) as u8,
            (y * 13 % 256) as u8,
            ((x ^ y) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

/// Saves `img` under `dir`, the format following the extension of `name`
pub fn write_image(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"definitely not image data").unwrap();
    path
}

/// Saves `img` as a JPEG padded with comment segments until the file
/// exceeds `min_size` bytes. Decoders skip the comments.
pub fn write_padded_jpeg(dir: &Path, name: &str, img: &DynamicImage, min_size: u64) -> PathBuf {
    const SEGMENT_PAYLOAD: usize = 65_533;

    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, ImageFormat::Jpeg).unwrap();
    let encoded = encoded.into_inner();

    // SOI, then the padding, then the rest of the stream
    let mut bytes = encoded[..2].to_vec();
    while ((bytes.len() + encoded.len()) as u64) <= min_size {
        let length = (SEGMENT_PAYLOAD + 2) as u16;
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend(std::iter::repeat(b'x').take(SEGMENT_PAYLOAD));
    }
    bytes.extend_from_slice(&encoded[2..]);

    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Executable shell script that can be pointed to as the quantizer binary
#[cfg(unix)]
pub fn fake_quantizer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-pngquant");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
