//! Batch watermarking command

use clap::ArgMatches;
use log::{info, warn};
use std::path::PathBuf;

use crate::api::Watermarker;
use crate::commands::command_traits::Command;
use crate::commands::{config_from_args, input_dir_from_args};
use crate::config::WatermarkConfig;
use crate::errors::WatermarkResult;

/// Watermarks every image in a directory on a worker pool
pub struct WatermarkCommand {
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    config: WatermarkConfig,
}

impl WatermarkCommand {
    pub fn new(args: &ArgMatches) -> WatermarkResult<Self> {
        let input_dir = input_dir_from_args(args)?;
        let output_dir = args.get_one::<String>("output").map(PathBuf::from);
        let config = config_from_args(args)?;
        info!("Input directory: {}", input_dir.display());

        Ok(WatermarkCommand {
            input_dir,
            output_dir,
            config,
        })
    }
}

impl Command for WatermarkCommand {
    fn execute(&self) -> WatermarkResult<()> {
        let watermarker = Watermarker::new(self.config.clone())?;
        let report = watermarker.run_directory(&self.input_dir, self.output_dir.as_deref())?;

        for failure in &report.failures {
            warn!("Not watermarked: {} ({})", failure.path.display(), failure.message);
        }
        println!(
            "Watermarked {} of {} images ({} with metadata, {} failed)",
            report.processed(),
            report.total(),
            report.with_metadata(),
            report.failed()
        );
        Ok(())
    }
}
