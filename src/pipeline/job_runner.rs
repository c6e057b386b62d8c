// Phase 8: ジョブ単位: 画像処理 → オブジェクトストレージへ保存 → レコード

use tracing::info;

use crate::chop::compositor::CropConfig;
use crate::chop::{BoundaryDetector, BoundingBox};
use crate::config::job::{ImageJob, JobFile};
use crate::config::merged::MergedConfig;
use crate::config::settings::Settings;
use crate::error::ChopError;
use crate::fetch::ImageSource;
use crate::pipeline::image_processor::{ChopOutcome, process_chop_image};
use crate::record::{ImageRecord, StoredCrop, StoredObject};
use crate::storage::key::{filename_from_url, object_key};
use crate::storage::{ObjectStore, sha256_hex};

/// Configuration for a single image job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub image_url: String,
    /// Overrides the filename taken from the URL when deriving the object key.
    pub filename: Option<String>,
    pub study: Option<String>,
    pub stored_crop: Option<StoredCrop>,
    pub crop: CropConfig,
}

impl JobConfig {
    /// Merge an image entry of a job file with the global settings.
    ///
    /// Per-image overrides are validated here so a bad entry fails when the
    /// job file is loaded, before anything is fetched.
    pub fn from_job(
        settings: &Settings,
        job_file: &JobFile,
        image: &ImageJob,
    ) -> crate::error::Result<Self> {
        let merged = MergedConfig::new(settings, job_file, image);
        let crop = merged.crop_config();
        if !(1..=100).contains(&crop.jpeg_quality) {
            return Err(ChopError::config(format!(
                "{}: jpeg_quality must be 1-100, got {}",
                image.url, crop.jpeg_quality
            )));
        }
        crop.validate().map_err(|e| match e {
            ChopError::ConfigError(msg) => ChopError::config(format!("{}: {msg}", image.url)),
            other => other,
        })?;

        Ok(JobConfig {
            image_url: image.url.clone(),
            filename: image.filename.clone(),
            study: merged.study.clone(),
            stored_crop: image.crop,
            crop,
        })
    }
}

/// Collaborators a job runs against. Passed explicitly per batch.
#[derive(Clone, Copy)]
pub struct JobContext<'a> {
    pub source: &'a dyn ImageSource,
    pub detector: &'a dyn BoundaryDetector,
    pub store: &'a dyn ObjectStore,
}

/// Result of processing a single job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Stored {
        image_url: String,
        bbox: BoundingBox,
        area_ratio: Option<f64>,
        source_width: u32,
        source_height: u32,
        stored: StoredObject,
    },
    NoChopDetected {
        image_url: String,
        source_width: u32,
        source_height: u32,
        area_ratio: f64,
    },
}

impl JobResult {
    pub fn to_record(&self) -> ImageRecord {
        match self {
            JobResult::Stored {
                image_url,
                bbox,
                area_ratio,
                source_width,
                source_height,
                stored,
            } => ImageRecord::processed(
                image_url,
                bbox,
                (*source_width, *source_height),
                *area_ratio,
                stored.clone(),
            ),
            JobResult::NoChopDetected {
                image_url,
                source_width,
                source_height,
                area_ratio,
            } => ImageRecord::no_chop_detected(
                image_url,
                (*source_width, *source_height),
                *area_ratio,
            ),
        }
    }
}

/// Object key the processed image of `config` is stored under.
///
/// Depends only on the job configuration, so it can be computed before
/// the image is fetched.
pub fn job_object_key(config: &JobConfig) -> crate::error::Result<String> {
    let filename = match &config.filename {
        Some(name) => name.clone(),
        None => filename_from_url(&config.image_url)?,
    };
    object_key(config.study.as_deref(), &filename, config.crop.output_format)
}

/// Run one image through fetch → detect → crop → upload.
///
/// Nothing is uploaded when no chop is detected.
pub fn run_job(config: &JobConfig, ctx: &JobContext<'_>) -> crate::error::Result<JobResult> {
    let outcome = process_chop_image(
        &config.image_url,
        ctx.source,
        ctx.detector,
        config.stored_crop.as_ref(),
        &config.crop,
    )?;

    match outcome {
        ChopOutcome::NoChopDetected {
            source_width,
            source_height,
            area_ratio,
        } => Ok(JobResult::NoChopDetected {
            image_url: config.image_url.clone(),
            source_width,
            source_height,
            area_ratio,
        }),
        ChopOutcome::Detected {
            bbox,
            area_ratio,
            image,
            source_width,
            source_height,
        } => {
            let key = job_object_key(config)?;
            let url = ctx.store.put(&key, &image.bytes, image.content_type)?;
            info!(image_url = %config.image_url, key = %key, confidence = bbox.confidence, "stored processed chop");

            Ok(JobResult::Stored {
                image_url: config.image_url.clone(),
                bbox,
                area_ratio,
                source_width,
                source_height,
                stored: StoredObject {
                    key,
                    url,
                    sha256: sha256_hex(&image.bytes),
                },
            })
        }
    }
}
