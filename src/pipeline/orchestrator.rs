// Phase 9: 全ジョブ実行

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::warn;

use crate::error::ChopError;
use crate::pipeline::job_runner::{JobConfig, JobContext, JobResult, job_object_key, run_job};
use crate::record::{ImageRecord, RecordStatus};

/// Run multiple jobs, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
///
/// `parallel_workers == 0` uses rayon's global pool; otherwise a dedicated
/// pool with that many threads is built for this batch.
pub fn run_all_jobs(
    jobs: &[JobConfig],
    ctx: &JobContext<'_>,
    parallel_workers: usize,
) -> crate::error::Result<Vec<crate::error::Result<JobResult>>> {
    let conflicts = find_key_conflicts(jobs);

    let run = || -> Vec<crate::error::Result<JobResult>> {
        jobs.par_iter()
            .zip(conflicts.par_iter())
            .map(|(job, conflict)| {
                let result = match conflict {
                    Some(owner) => Err(ChopError::storage(format!(
                        "object key '{}' is already used by {} in this batch",
                        owner.key, jobs[owner.index].image_url
                    ))),
                    None => run_job(job, ctx),
                };
                if let Err(e) = &result {
                    warn!(image_url = %job.image_url, "image failed: {e}");
                }
                result
            })
            .collect()
    };

    if parallel_workers == 0 {
        return Ok(run());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_workers)
        .build()
        .map_err(|e| ChopError::config(format!("Failed to build worker pool: {e}")))?;
    Ok(pool.install(run))
}

/// Earlier job that claimed the same object key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyOwner {
    index: usize,
    key: String,
}

/// For every job, the earlier job (in input order) whose object key it
/// would overwrite. The first job to claim a key keeps it.
///
/// Jobs whose key cannot be derived are left to fail in [`run_job`].
fn find_key_conflicts(jobs: &[JobConfig]) -> Vec<Option<KeyOwner>> {
    let mut owners: HashMap<String, usize> = HashMap::new();
    jobs.iter()
        .enumerate()
        .map(|(index, job)| {
            let key = job_object_key(job).ok()?;
            match owners.get(&key) {
                Some(&owner) => Some(KeyOwner { index: owner, key }),
                None => {
                    owners.insert(key, index);
                    None
                }
            }
        })
        .collect()
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub no_chop_detected: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.no_chop_detected + self.failed
    }
}

/// Turn per-job results into persistence records plus summary counts.
///
/// `jobs` and `results` must be parallel slices, as returned by
/// [`run_all_jobs`].
pub fn collect_records(
    jobs: &[JobConfig],
    results: &[crate::error::Result<JobResult>],
) -> (Vec<ImageRecord>, BatchSummary) {
    let mut summary = BatchSummary::default();
    let records: Vec<ImageRecord> = jobs
        .iter()
        .zip(results)
        .map(|(job, result)| match result {
            Ok(job_result) => job_result.to_record(),
            Err(e) => ImageRecord::failed(&job.image_url, e.to_string()),
        })
        .collect();

    for record in &records {
        match record.status {
            RecordStatus::Processed => summary.processed += 1,
            RecordStatus::NoChopDetected => summary.no_chop_detected += 1,
            RecordStatus::Failed => summary.failed += 1,
        }
    }

    (records, summary)
}
