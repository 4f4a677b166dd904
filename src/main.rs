use adaptive_squeeze::batch::{collect_image_files, run_client_batch, BatchProcessor};
use adaptive_squeeze::cache::CacheIndex;
use adaptive_squeeze::cli::{Args, Commands, SettingsArgs};
use adaptive_squeeze::config::ServiceConfig;
use adaptive_squeeze::constants::QUANTIZER_BINARY;
use adaptive_squeeze::info::{analyze_image, print_report};
use adaptive_squeeze::processing::Compressor;
use adaptive_squeeze::quantizer::{install_instructions, Pngquant};
use adaptive_squeeze::sweeper::RetentionSweeper;
use adaptive_squeeze::utils::create_progress_bar;
use adaptive_squeeze::{logger, status};
use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);
    setup_thread_pool(args.threads);

    match args.command {
        Commands::Batch {
            input,
            recursive,
            settings,
            convert_to_jpeg,
            no_cache,
            service,
        } => run_batch(&input, recursive, &settings, convert_to_jpeg, no_cache, &service)?,
        Commands::Sweep { watch, service } => run_sweep(watch, &service)?,
        Commands::Config { service } => {
            println!("{}", serde_json::to_string_pretty(&service.introspection())?);
        }
        Commands::Analyze { input, json } => show_analysis(&input, json)?,
    }

    Ok(())
}

fn setup_thread_pool(threads: Option<usize>) {
    let num_threads = threads.unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .unwrap_or_else(|e| {
            warn!("Failed to set thread pool size: {}", e);
        });
}

fn run_batch(
    input: &str,
    recursive: bool,
    settings: &SettingsArgs,
    convert_to_jpeg: Vec<String>,
    no_cache: bool,
    service: &ServiceConfig,
) -> Result<()> {
    let files = collect_image_files(input, recursive)
        .with_context(|| format!("Failed to collect images from {}", input))?;
    if files.is_empty() {
        bail!("No image files found in {}", input);
    }
    status!("🔍 Found {} image files", files.len());

    let processor = BatchProcessor::new(
        Compressor::new(quantizer_or_fallback(service)),
        service.areas(),
        service.max_files,
    )
    .with_progress(create_progress_bar(files.len() as u64, logger::is_quiet()));

    let mut index = if no_cache {
        CacheIndex::new()
    } else {
        CacheIndex::load(&service.data_dir)
    };

    let convert: HashSet<String> = convert_to_jpeg.into_iter().collect();
    let report = run_client_batch(
        &processor,
        &files,
        &settings.to_settings(),
        &convert,
        &mut index,
        service.max_file_size,
    )
    .context("Batch compression failed")?;

    fs::create_dir_all(&service.data_dir)
        .with_context(|| format!("Failed to create {}", service.data_dir.display()))?;
    index
        .save(&service.data_dir)
        .context("Failed to write the cache manifest")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    status!(
        "✅ {} compressed, {} cached, {} failed",
        report.summary.compressed,
        report.summary.cached,
        report.summary.failed
    );

    Ok(())
}

/// PNG files fail individually when pngquant is missing; other formats still go through
fn quantizer_or_fallback(service: &ServiceConfig) -> Pngquant {
    match service.quantizer() {
        Ok(quantizer) => {
            match quantizer.version() {
                Ok(version) => info!("Using pngquant {} at {}", version, quantizer.path().display()),
                Err(e) => warn!("pngquant at {} is not usable: {}", quantizer.path().display(), e),
            }
            quantizer
        }
        Err(e) => {
            warn!("{}. PNG files will fail until it is installed:", e);
            for (platform, command) in install_instructions() {
                warn!("  {}: {}", platform, command);
            }
            Pngquant::with_path(QUANTIZER_BINARY)
                .with_timeout(Duration::from_secs(service.pngquant_timeout))
        }
    }
}

fn run_sweep(watch: bool, service: &ServiceConfig) -> Result<()> {
    let sweeper = RetentionSweeper::new(&service.areas(), service.retention());

    if !watch {
        let report = sweeper.sweep();
        println!("{}", serde_json::to_string_pretty(&report.to_response())?);
        return Ok(());
    }

    let interval = service.sweep_interval();
    status!(
        "🧹 Sweeping every {:?}, retention {:?}. Press Ctrl-C to stop.",
        interval,
        sweeper.retention()
    );

    let rt = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    rt.block_on(async {
        tokio::select! {
            _ = sweeper.run_periodic(interval) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Stopping periodic sweeper");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn show_analysis(input: &Path, json: bool) -> Result<()> {
    let report = analyze_image(input)
        .with_context(|| format!("Failed to analyze {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(input, &report);
    }

    Ok(())
}
