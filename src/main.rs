use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use chop_cropper::chop::{BoundaryDetector, HeuristicDetector};
use chop_cropper::config::job::{JobFile, parse_image_url};
use chop_cropper::config::settings::{DetectorKind, Settings};
use chop_cropper::config::{self};
use chop_cropper::fetch::HttpFetcher;
use chop_cropper::pipeline::job_runner::{JobConfig, JobContext};
use chop_cropper::pipeline::orchestrator::{BatchSummary, collect_records, run_all_jobs};
use chop_cropper::record::ImageRecord;
use chop_cropper::storage::FsObjectStore;
use tracing_subscriber::EnvFilter;

/// Jobs sharing one settings file.
struct Batch {
    settings: Settings,
    jobs: Vec<JobConfig>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: chop_cropper <jobs.yaml | image_url | ->...");
        eprintln!("  Detect, crop and store pork chop images.");
        eprintln!("  '-' reads a JSON array of image URLs from stdin.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("chop_cropper {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chop_cropper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut batches: Vec<Batch> = Vec::new();
    let mut loose_urls: Vec<String> = Vec::new();

    for arg in &args {
        if arg == "-" {
            match read_stdin_urls() {
                Ok(urls) => loose_urls.extend(urls),
                Err(e) => {
                    eprintln!("ERROR: Failed to read URLs from stdin: {e}");
                    return ExitCode::FAILURE;
                }
            }
            continue;
        }

        if arg.starts_with("http://") || arg.starts_with("https://") {
            match parse_image_url(arg) {
                Ok(url) => loose_urls.push(url),
                Err(e) => {
                    eprintln!("ERROR: {e}");
                    return ExitCode::FAILURE;
                }
            }
            continue;
        }

        match load_job_file(Path::new(arg)) {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                eprintln!("ERROR: {arg}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if !loose_urls.is_empty() {
        // Bare URLs use settings.yaml from the working directory.
        let settings = match config::load_settings_in(Path::new(".")) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings: {e}");
                return ExitCode::FAILURE;
            }
        };
        let job_file = match JobFile::from_urls(&loose_urls) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        };
        match batch_from_job_file(settings, &job_file) {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut all_records: Vec<ImageRecord> = Vec::new();
    let mut summary = BatchSummary::default();

    for batch in &batches {
        match run_batch(batch) {
            Ok((records, batch_summary)) => {
                summary.processed += batch_summary.processed;
                summary.no_chop_detected += batch_summary.no_chop_detected;
                summary.failed += batch_summary.failed;
                all_records.extend(records);
            }
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    match serde_json::to_string_pretty(&all_records) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("ERROR: Failed to serialize results: {e}");
            return ExitCode::FAILURE;
        }
    }

    eprintln!(
        "Processed: {}, no chop detected: {}, failed: {} (total {})",
        summary.processed,
        summary.no_chop_detected,
        summary.failed,
        summary.total()
    );

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load a job YAML file together with the settings.yaml next to it.
fn load_job_file(job_file_path: &Path) -> chop_cropper::error::Result<Batch> {
    let settings = config::load_settings_for_job(job_file_path)?;
    let yaml_content = std::fs::read_to_string(job_file_path)?;
    let job_file = JobFile::from_yaml(&yaml_content)?;
    batch_from_job_file(settings, &job_file)
}

fn batch_from_job_file(
    settings: Settings,
    job_file: &JobFile,
) -> chop_cropper::error::Result<Batch> {
    let jobs = job_file
        .images
        .iter()
        .map(|image| JobConfig::from_job(&settings, job_file, image))
        .collect::<chop_cropper::error::Result<Vec<_>>>()?;
    Ok(Batch { settings, jobs })
}

fn read_stdin_urls() -> chop_cropper::error::Result<Vec<String>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let urls: Vec<String> = serde_json::from_str(&input).map_err(|e| {
        chop_cropper::error::ChopError::config(format!("Expected JSON array of image URLs: {e}"))
    })?;
    urls.iter().map(|u| parse_image_url(u)).collect()
}

fn run_batch(
    batch: &Batch,
) -> chop_cropper::error::Result<(Vec<ImageRecord>, BatchSummary)> {
    let fetcher = HttpFetcher::from_settings(&batch.settings)?;
    let store = FsObjectStore::new(
        &batch.settings.storage_dir,
        batch.settings.public_base_url.clone(),
    );
    let detector: &dyn BoundaryDetector = match batch.settings.detector {
        DetectorKind::Heuristic => &HeuristicDetector,
    };
    let ctx = JobContext {
        source: &fetcher,
        detector,
        store: &store,
    };

    let results = run_all_jobs(&batch.jobs, &ctx, batch.settings.parallel_workers)?;
    Ok(collect_records(&batch.jobs, &results))
}
