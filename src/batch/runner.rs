//! # Batch Runner
//!
//! Embeds one message into many carrier images. Each image is an independent
//! codec call, so jobs run in parallel on tokio's blocking pool; a semaphore
//! caps how many run at once.

use anyhow::{bail, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::report::BatchReport;
use crate::common::config::BatchConfig;
use crate::processing::error::StegoError;
use crate::processing::{carrier, framer, Codec};

/// One cover image to read and the path its stego copy is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Build one job per `*.png` file in `input_dir`, sorted by file name.
///
/// Outputs are written to `output_dir` as `stego_<name>.png`.
pub fn jobs_from_dir(input_dir: &Path, output_dir: &Path) -> Result<Vec<BatchJob>> {
    let mut jobs = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !path.is_file() || !is_png {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let output = output_dir.join(format!("stego_{}", name));
            jobs.push(BatchJob {
                input: path.clone(),
                output,
            });
        }
    }
    jobs.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(jobs)
}

struct JobSuccess {
    bits_used: usize,
    capacity_bits: usize,
}

/// Load, embed and save a single carrier. Runs on a blocking thread.
fn process_job(
    codec: &Codec,
    job: &BatchJob,
    key: &str,
    message: &str,
) -> Result<JobSuccess, StegoError> {
    let cover = carrier::load_png_file(&job.input)?;
    let capacity_bits = codec.capacity(&cover)?;
    let stego = codec.embed(&cover, key, message)?;
    carrier::save_png_file(&stego, &job.output)?;
    Ok(JobSuccess {
        bits_used: framer::framed_bits(message.len()),
        capacity_bits,
    })
}

/// Runs embedding jobs with bounded parallelism.
pub struct BatchRunner {
    codec: Codec,
    workers: usize,
    max_queue_size: usize,
}

impl BatchRunner {
    pub fn new(codec: Codec, config: &BatchConfig) -> Self {
        Self {
            codec,
            workers: config.workers.max(1),
            max_queue_size: config.max_queue_size,
        }
    }

    /// Embed `message` under `key` into every job's input.
    ///
    /// Individual job failures are recorded in the report rather than aborting
    /// the batch. Only a batch larger than `max_queue_size` or a panicked worker
    /// fails the whole call.
    pub async fn run(&self, jobs: Vec<BatchJob>, key: &str, message: &str) -> Result<BatchReport> {
        if jobs.len() > self.max_queue_size {
            bail!(
                "Batch of {} images exceeds max_queue_size {}",
                jobs.len(),
                self.max_queue_size
            );
        }

        info!(
            "📦 Starting batch of {} images with {} workers",
            jobs.len(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let key: Arc<str> = Arc::from(key);
        let message: Arc<str> = Arc::from(message);
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let codec = self.codec.clone();
            let key = key.clone();
            let message = message.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow::anyhow!("Worker pool closed: {}", e))?;
                let start = Instant::now();

                // Codec work is CPU-bound; keep it off the async workers
                let (job, outcome) = tokio::task::spawn_blocking(move || {
                    let outcome = process_job(&codec, &job, &key, &message);
                    (job, outcome)
                })
                .await
                .map_err(|e| anyhow::anyhow!("Embedding task panicked: {}", e))?;

                Ok::<_, anyhow::Error>((index, job, start.elapsed(), outcome))
            });
        }

        let mut finished: Vec<(usize, BatchJob, Duration, Result<JobSuccess, StegoError>)> =
            Vec::new();
        while let Some(joined) = tasks.join_next().await {
            finished.push(joined??);
        }
        finished.sort_by_key(|(index, ..)| *index);

        let mut report = BatchReport::new();
        for (_, job, elapsed, outcome) in finished {
            match outcome {
                Ok(done) => {
                    info!("✅ {} -> {}", job.input.display(), job.output.display());
                    report.record_success(
                        &job.input,
                        &job.output,
                        elapsed,
                        done.bits_used,
                        done.capacity_bits,
                    );
                }
                Err(e) => {
                    error!("❌ {}: {}", job.input.display(), e);
                    report.record_failure(&job.input, &job.output, elapsed, e.kind(), e.to_string());
                }
            }
        }

        let stats = report.aggregate();
        info!(
            "📊 Batch finished: {}/{} succeeded",
            stats.successful_jobs, stats.total_jobs
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_only_pick_png_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::write(dir.path().join("a.PNG"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let out = Path::new("/tmp/out");
        let jobs = jobs_from_dir(dir.path(), out).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].input, dir.path().join("a.PNG"));
        assert_eq!(jobs[0].output, out.join("stego_a.PNG"));
        assert_eq!(jobs[1].output, out.join("stego_b.png"));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let runner = BatchRunner::new(
            Codec::default(),
            &BatchConfig {
                workers: 1,
                max_queue_size: 1,
            },
        );
        let job = BatchJob {
            input: PathBuf::from("a.png"),
            output: PathBuf::from("b.png"),
        };
        let result = runner.run(vec![job.clone(), job], "k", "m").await;
        assert!(result.is_err());
    }
}
