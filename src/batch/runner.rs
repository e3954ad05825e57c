//! Worker pool dispatch for batches of images

use log::{error, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::utils::progress::ProgressTracker;
use crate::watermark::pipeline::{Pipeline, ProcessOutcome};

/// A file that could not be watermarked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Results of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ProcessOutcome>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.processed() + self.failed()
    }

    /// Number of files that kept their DFL metadata
    pub fn with_metadata(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ProcessOutcome::Watermarked { .. }))
            .count()
    }
}

/// Runs the pipeline over many files on a fixed-size thread pool
pub struct BatchRunner<'a> {
    pipeline: &'a Pipeline<'a>,
    workers: usize,
    show_progress: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(pipeline: &'a Pipeline<'a>, workers: usize) -> Self {
        BatchRunner {
            pipeline,
            workers: workers.max(1),
            show_progress: true,
        }
    }

    /// Enables or disables the terminal progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Processes every path; a failing file never stops the others
    pub fn run(&self, paths: &[PathBuf]) -> WatermarkResult<BatchReport> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| WatermarkError::GenericError(format!("failed to start worker pool: {}", e)))?;

        info!("Processing {} images with {} workers", paths.len(), self.workers);
        let progress = if self.show_progress {
            ProgressTracker::new(paths.len() as u64, "Watermarking")
        } else {
            ProgressTracker::hidden(paths.len() as u64)
        };

        let results: Vec<(PathBuf, WatermarkResult<ProcessOutcome>)> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let result = self.pipeline.process(path);
                    if let Err(e) = &result {
                        error!("Failed to watermark {}: {}", path.display(), e);
                    }
                    progress.increment(1);
                    (path.clone(), result)
                })
                .collect()
        });
        progress.finish();

        let mut report = BatchReport::default();
        for (path, result) in results {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => report.failures.push(FileFailure {
                    path,
                    message: e.to_string(),
                }),
            }
        }

        info!(
            "Batch finished: {} watermarked ({} with metadata), {} failed",
            report.processed(),
            report.with_metadata(),
            report.failed()
        );
        Ok(report)
    }

    /// Processes only the first path on the calling thread
    ///
    /// Errors are returned instead of collected, which makes single-file
    /// debugging straightforward.
    pub fn run_first(&self, paths: &[PathBuf]) -> WatermarkResult<ProcessOutcome> {
        let first = paths
            .first()
            .ok_or_else(|| WatermarkError::GenericError("no images to process".to_string()))?;
        info!("Debug mode: processing only {}", first.display());
        self.pipeline.process(first)
    }
}
