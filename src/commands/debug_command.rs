//! Single-file debugging command
//!
//! Runs the pipeline on the first image of the directory without the
//! worker pool so errors surface directly.

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::Watermarker;
use crate::commands::command_traits::Command;
use crate::commands::{config_from_args, input_dir_from_args};
use crate::config::WatermarkConfig;
use crate::errors::WatermarkResult;

pub struct DebugCommand {
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    config: WatermarkConfig,
}

impl DebugCommand {
    pub fn new(args: &ArgMatches) -> WatermarkResult<Self> {
        Ok(DebugCommand {
            input_dir: input_dir_from_args(args)?,
            output_dir: args.get_one::<String>("output").map(PathBuf::from),
            config: config_from_args(args)?,
        })
    }
}

impl Command for DebugCommand {
    fn execute(&self) -> WatermarkResult<()> {
        let watermarker = Watermarker::new(self.config.clone())?;
        let outcome = watermarker.run_debug(&self.input_dir, self.output_dir.as_deref())?;
        println!("{}", outcome);
        Ok(())
    }
}
