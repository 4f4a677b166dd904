//! Utility functions shared by the pipeline and the CLI

use crate::constants::{PROGRESS_BAR_TEMPLATE, SUPPORTED_IMAGE_EXTENSIONS};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Check if a file path has one of the accepted image extensions
///
/// # Arguments
/// * `path` - The file path to check
///
/// # Returns
/// * `true` if the extension is jpg, jpeg, png, bmp or webp (any case)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Create a progress bar with consistent styling
///
/// # Arguments
/// * `len` - Number of steps
/// * `hidden` - Draw nothing, for quiet mode and JSON-only output
pub fn create_progress_bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 B")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Calculate compression ratio as a percentage, rounded to two decimals
///
/// # Arguments
/// * `original_size` - Size of the encoder input in bytes
/// * `compressed_size` - Size of the encoder output in bytes
///
/// # Returns
/// * Positive for a reduction, negative when the output grew
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Milliseconds since the Unix epoch; zero for clocks set before 1970
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
