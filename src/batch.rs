use crate::cache::{CacheIndex, FileFingerprint};
use crate::classify::ImageMetadata;
use crate::error::{Result, SqueezeError};
use crate::formats::SourceFormat;
use crate::processing::{
    target_format, with_target_extension, CompressedInfo, CompressionResult, CompressionSuccess,
    Compressor, OriginalInfo, ResizedInfo,
};
use crate::quantizer::PngEncoder;
use crate::resize::{resize_image, ResizeOutcome};
use crate::sanitize::sanitize_error_message;
use crate::scope::ParameterScope;
use crate::settings::{CompressionSettings, ResizeMode};
use crate::storage::{resized_filename, StorageArea, StorageAreas, StoredUpload};
use crate::utils::is_image_file;
use glob::glob;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Message for files that cannot be read at planning time
const UNREADABLE_FILE_MESSAGE: &str = "File does not exist or is damaged";

/// One batch submission: stored uploads plus the flat parameter set
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub files: Vec<StoredUpload>,
    pub settings: CompressionSettings,
    /// Original names of the files the user asked to convert to JPEG
    pub convert_to_jpeg: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<CompressionResult>,
}

/// Server side of a batch: resize then compress every file, keeping order
pub struct BatchProcessor<E: PngEncoder> {
    compressor: Compressor<E>,
    areas: StorageAreas,
    max_files: usize,
    progress: ProgressBar,
}

impl<E: PngEncoder> BatchProcessor<E> {
    pub fn new(compressor: Compressor<E>, areas: StorageAreas, max_files: usize) -> Self {
        Self {
            compressor,
            areas,
            max_files,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn areas(&self) -> &StorageAreas {
        &self.areas
    }

    /// Processes every file of the request.
    ///
    /// Only request-level problems are errors. Each file gets exactly one
    /// result, in submission order, and a failing file never affects the others.
    pub fn process(&self, request: &BatchRequest) -> Result<BatchResponse> {
        if request.files.is_empty() {
            return Err(SqueezeError::NoImageFilesFound("batch request".to_string()));
        }
        if request.files.len() > self.max_files {
            return Err(SqueezeError::BatchFileLimitExceeded(
                request.files.len(),
                self.max_files,
            ));
        }
        request.settings.validate()?;
        self.areas.ensure_dirs()?;

        let start_time = Instant::now();
        self.progress.set_length(request.files.len() as u64);

        let results: Vec<CompressionResult> = request
            .files
            .par_iter()
            .map(|upload| {
                let convert = request.convert_to_jpeg.contains(&upload.original_name);
                let result = self.process_file(upload, &request.settings, convert);
                self.progress.inc(1);
                result
            })
            .collect();

        self.progress.finish_and_clear();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Processed {} files in {:?} ({} failed)",
            results.len(),
            start_time.elapsed(),
            failed
        );

        Ok(BatchResponse { results })
    }

    fn process_file(
        &self,
        upload: &StoredUpload,
        settings: &CompressionSettings,
        convert_to_jpeg: bool,
    ) -> CompressionResult {
        match self.try_process_file(upload, settings, convert_to_jpeg) {
            Ok(success) => CompressionResult::Success(Box::new(success)),
            Err(e) => {
                warn!("Failed to process {}: {}", upload.original_name, e);
                CompressionResult::failure(
                    upload.original_name.clone(),
                    sanitize_error_message(&e.to_string()),
                )
            }
        }
    }

    fn try_process_file(
        &self,
        upload: &StoredUpload,
        settings: &CompressionSettings,
        convert_to_jpeg: bool,
    ) -> Result<CompressionSuccess> {
        let original = ImageMetadata::read(&upload.path)?;
        let converted_to_jpeg = convert_to_jpeg && original.format == Some(SourceFormat::Png);

        let mut input = upload.path.clone();
        let mut resized = None;

        if settings.resize_mode != ResizeMode::Keep {
            let target = target_format(original.format, convert_to_jpeg);
            let target_name = with_target_extension(&upload.stored_name, target);
            let resized_name = resized_filename(&target_name);
            let dest = self.areas.resized_path(&target_name);

            match resize_image(&upload.path, &dest, &settings.resize_request(), target) {
                Ok(ResizeOutcome::Resized(artifact)) => {
                    resized = Some(ResizedInfo {
                        resized_url: format!("{}{}", StorageArea::Resized.url_prefix(), resized_name),
                        filename: resized_name,
                        size: artifact.size,
                        dimensions: format!("{}x{}", artifact.width, artifact.height),
                    });
                    input = artifact.path;
                }
                Ok(ResizeOutcome::Skipped) | Ok(ResizeOutcome::Bypassed) => {
                    debug!(file = %upload.original_name, "Compressing original dimensions");
                }
                Err(e) => {
                    warn!(
                        "Resize failed for {}, compressing the original: {}",
                        upload.original_name, e
                    );
                }
            }
        }

        let outcome = self.compressor.compress(
            &input,
            &self.areas.compressed,
            &upload.stored_name,
            convert_to_jpeg,
            &settings.overrides(),
        )?;

        // The compression input may be the resized artifact; report the upload
        let format = original
            .format
            .map(|format| format.name().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        Ok(CompressionSuccess {
            success: true,
            converted_to_jpeg,
            resize_mode: settings.resize_mode,
            profile: outcome.profile,
            original: OriginalInfo {
                filename: upload.original_name.clone(),
                size: original.byte_size,
                dimensions: original.dimensions_label(),
                format,
            },
            download_url: format!(
                "{}{}",
                StorageArea::Compressed.url_prefix(),
                outcome.filename
            ),
            original_url: format!("{}{}", StorageArea::Upload.url_prefix(), upload.stored_name),
            compressed: CompressedInfo {
                filename: outcome.filename,
                size: outcome.compressed_size,
                compression_ratio: outcome.compression_ratio,
            },
            resized,
        })
    }
}

/// A file the client will submit
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub index: usize,
    pub path: PathBuf,
    pub fingerprint: FileFingerprint,
    pub scope: ParameterScope,
}

/// Client-side split of a working set into stale and reusable files
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub total: usize,
    pub to_compress: Vec<PlannedFile>,
    /// Reused results, with the position of their file
    pub cached: Vec<(usize, CompressionResult)>,
    /// Files that could not be read, never submitted
    pub rejected: Vec<(usize, CompressionResult)>,
    pub working_set: HashSet<FileFingerprint>,
}

/// Decides per file whether the cached result is still valid.
///
/// The scope is built from the file's extension, the same way a browser
/// client sees the file type before uploading it.
pub fn plan_batch(
    files: &[PathBuf],
    settings: &CompressionSettings,
    convert_to_jpeg: &HashSet<String>,
    index: &CacheIndex,
) -> BatchPlan {
    let mut plan = BatchPlan {
        total: files.len(),
        ..BatchPlan::default()
    };

    for (position, path) in files.iter().enumerate() {
        let name = display_name(path);

        let fingerprint = match readable_fingerprint(path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                debug!(file = %name, error = %e, "Rejecting unreadable file");
                plan.rejected.push((
                    position,
                    CompressionResult::failure(name, UNREADABLE_FILE_MESSAGE),
                ));
                continue;
            }
        };

        let scope = ParameterScope::for_file(
            SourceFormat::from_path(path),
            settings,
            convert_to_jpeg.contains(&name),
        );
        plan.working_set.insert(fingerprint.clone());

        match index.lookup(&fingerprint, &scope) {
            Some(result) => {
                debug!(file = %name, "Using cached result");
                plan.cached.push((position, result.clone()));
            }
            None => {
                debug!(file = %name, "Needs compression");
                plan.to_compress.push(PlannedFile {
                    index: position,
                    path: path.clone(),
                    fingerprint,
                    scope,
                });
            }
        }
    }

    plan
}

fn readable_fingerprint(path: &Path) -> Result<FileFingerprint> {
    let fingerprint = FileFingerprint::from_path(path)?;
    let mut head = Vec::with_capacity(1);
    File::open(path)?.take(1).read_to_end(&mut head)?;
    Ok(fingerprint)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One entry of a client run, flagged when it came from the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientResult {
    #[serde(flatten)]
    pub result: CompressionResult,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub compressed: usize,
    pub cached: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientReport {
    pub results: Vec<ClientResult>,
    pub summary: RunSummary,
}

/// Places cached, rejected and fresh results back at their file's position
pub fn merge_results(
    total: usize,
    cached: Vec<(usize, CompressionResult)>,
    fresh: Vec<(usize, CompressionResult)>,
) -> ClientReport {
    let mut slots: Vec<Option<ClientResult>> = vec![None; total];

    for (position, result) in cached {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(ClientResult { result, cached: true });
        }
    }
    for (position, result) in fresh {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(ClientResult {
                result,
                cached: false,
            });
        }
    }

    let results: Vec<ClientResult> = slots.into_iter().flatten().collect();
    let summary = RunSummary {
        compressed: results
            .iter()
            .filter(|r| !r.cached && r.result.is_success())
            .count(),
        cached: results.iter().filter(|r| r.cached).count(),
        failed: results.iter().filter(|r| !r.result.is_success()).count(),
    };

    ClientReport { results, summary }
}

/// Client role of one run: plan, submit only stale files, merge, update the index
pub fn run_client_batch<E: PngEncoder>(
    processor: &BatchProcessor<E>,
    files: &[PathBuf],
    settings: &CompressionSettings,
    convert_to_jpeg: &HashSet<String>,
    index: &mut CacheIndex,
    max_file_size: u64,
) -> Result<ClientReport> {
    settings.validate()?;
    let plan = plan_batch(files, settings, convert_to_jpeg, index);
    info!(
        "{} files: {} to compress, {} cached, {} unreadable",
        plan.total,
        plan.to_compress.len(),
        plan.cached.len(),
        plan.rejected.len()
    );

    let mut fresh = plan.rejected;
    let mut submitted = Vec::with_capacity(plan.to_compress.len());
    let mut uploads = Vec::with_capacity(plan.to_compress.len());

    if !plan.to_compress.is_empty() {
        processor.areas().ensure_dirs()?;
    }

    for planned in plan.to_compress {
        match processor.areas().store_upload(&planned.path, max_file_size) {
            Ok(upload) => {
                uploads.push(upload);
                submitted.push(planned);
            }
            Err(e) => fresh.push((
                planned.index,
                CompressionResult::failure(
                    display_name(&planned.path),
                    sanitize_error_message(&e.to_string()),
                ),
            )),
        }
    }

    if !uploads.is_empty() {
        let request = BatchRequest {
            files: uploads,
            settings: settings.clone(),
            convert_to_jpeg: convert_to_jpeg.clone(),
        };
        let response = processor.process(&request)?;

        for (planned, result) in submitted.into_iter().zip(response.results) {
            index.record(planned.fingerprint, planned.scope, result.clone());
            fresh.push((planned.index, result));
        }
    }

    let pruned = index.retain_files(&plan.working_set);
    if pruned > 0 {
        debug!(pruned, "Dropped cache entries for files no longer submitted");
    }

    Ok(merge_results(plan.total, plan.cached, fresh))
}

/// Expands a file, directory or glob pattern into image paths
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| SqueezeError::NoImageFilesFound(input.to_string()))?
    } else {
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        image_files.push(canonical_input);
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        // Hidden entries are skipped, but the root itself may live in one
        let visible = |e: &walkdir::DirEntry| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        };

        for entry in walker.sort_by_file_name().into_iter().filter_entry(visible) {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(pattern) = glob(input) {
        for entry in pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(SqueezeError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}
