use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::{scan_image_paths, BatchReport, BatchRunner};
use crate::config::WatermarkConfig;
use crate::errors::{WatermarkError, WatermarkResult};
use crate::watermark::{Pipeline, ProcessOutcome, WatermarkFont};

/// Main interface to the dflmark library
///
/// Holds the configuration and the parsed font, both shared read-only by
/// every file processed through it.
pub struct Watermarker {
    config: WatermarkConfig,
    font: WatermarkFont,
    show_progress: bool,
}

impl Watermarker {
    /// Creates a watermarker, loading the font named in `config`
    pub fn new(config: WatermarkConfig) -> WatermarkResult<Self> {
        let font = WatermarkFont::load(&config.font_path)?;
        Ok(Self::with_font(config, font))
    }

    /// Creates a watermarker with an already parsed font
    pub fn with_font(config: WatermarkConfig, font: WatermarkFont) -> Self {
        Watermarker {
            config,
            font,
            show_progress: true,
        }
    }

    /// Enables or disables the batch progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Watermarks a single image into `output_dir`
    ///
    /// # Arguments
    /// * `input_path` - Image to watermark
    /// * `output_dir` - Directory for the result, created if missing
    ///
    /// # Returns
    /// What was done to the file, or an error
    pub fn process_image(&self, input_path: &Path, output_dir: &Path) -> WatermarkResult<ProcessOutcome> {
        fs::create_dir_all(output_dir)?;
        Pipeline::new(&self.config, &self.font, output_dir).process(input_path)
    }

    /// Watermarks every image in `input_dir`
    ///
    /// Results go into `output_dir` or, when `None`, the configured
    /// subdirectory of `input_dir`. Failing files are reported, not fatal.
    pub fn run_directory(&self, input_dir: &Path, output_dir: Option<&Path>) -> WatermarkResult<BatchReport> {
        let (paths, output_dir) = self.prepare(input_dir, output_dir)?;
        let pipeline = Pipeline::new(&self.config, &self.font, &output_dir);

        BatchRunner::new(&pipeline, self.worker_count())
            .with_progress(self.show_progress)
            .run(&paths)
    }

    /// Watermarks only the first image in `input_dir` on the calling thread
    pub fn run_debug(&self, input_dir: &Path, output_dir: Option<&Path>) -> WatermarkResult<ProcessOutcome> {
        let (paths, output_dir) = self.prepare(input_dir, output_dir)?;
        let pipeline = Pipeline::new(&self.config, &self.font, &output_dir);

        BatchRunner::new(&pipeline, 1).run_first(&paths)
    }

    /// Number of pool threads for batch runs
    pub fn worker_count(&self) -> usize {
        self.config
            .workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    fn prepare(&self, input_dir: &Path, output_dir: Option<&Path>) -> WatermarkResult<(Vec<PathBuf>, PathBuf)> {
        if !input_dir.is_dir() {
            return Err(WatermarkError::InputNotFound(input_dir.to_path_buf()));
        }

        let paths = scan_image_paths(input_dir, &self.config, false)?;
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.config.output_dir_for(input_dir),
        };
        fs::create_dir_all(&output_dir)?;

        info!(
            "Watermarking {} images from {} into {}",
            paths.len(),
            input_dir.display(),
            output_dir.display()
        );
        Ok((paths, output_dir))
    }
}
