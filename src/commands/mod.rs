//! CLI command implementations
//!
//! The binary picks one of these through `DflmarkCommandFactory`.

pub mod command_traits;
pub mod debug_command;
pub mod watermark_command;

pub use command_traits::{Command, CommandFactory};
pub use debug_command::DebugCommand;
pub use watermark_command::WatermarkCommand;

use clap::ArgMatches;
use log::debug;
use std::path::{Path, PathBuf};

use crate::config::WatermarkConfig;
use crate::errors::{WatermarkError, WatermarkResult};

/// Positional mode value that selects single-file debugging
pub const DEBUG_MODE: &str = "debug";

/// Factory for creating command instances based on CLI arguments
pub struct DflmarkCommandFactory;

impl DflmarkCommandFactory {
    pub fn new() -> Self {
        DflmarkCommandFactory
    }
}

impl Default for DflmarkCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for DflmarkCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> WatermarkResult<Box<dyn Command>> {
        match args.get_one::<String>("mode").map(String::as_str) {
            Some(DEBUG_MODE) => Ok(Box::new(DebugCommand::new(args)?)),
            Some(other) => Err(WatermarkError::GenericError(format!(
                "Unknown mode '{}', expected '{}'",
                other, DEBUG_MODE
            ))),
            None => Ok(Box::new(WatermarkCommand::new(args)?)),
        }
    }
}

pub(crate) fn input_dir_from_args(args: &ArgMatches) -> WatermarkResult<PathBuf> {
    args.get_one::<String>("input")
        .map(PathBuf::from)
        .ok_or_else(|| WatermarkError::GenericError("Missing input directory".to_string()))
}

/// Builds the configuration from an optional TOML file and CLI overrides
pub(crate) fn config_from_args(args: &ArgMatches) -> WatermarkResult<WatermarkConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => WatermarkConfig::from_file(Path::new(path))?,
        None => WatermarkConfig::default(),
    };

    if let Some(font) = args.get_one::<String>("font") {
        config.font_path = PathBuf::from(font);
    }
    if let Some(workers) = args.get_one::<String>("workers") {
        let count = workers
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| WatermarkError::ConfigError(format!("Invalid worker count: {}", workers)))?;
        config.workers = Some(count);
    }

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command as ClapCommand};

    fn parse(argv: &[&str]) -> ArgMatches {
        ClapCommand::new("dflmark")
            .arg(Arg::new("input").required(true).index(1))
            .arg(Arg::new("mode").index(2))
            .arg(Arg::new("workers").long("workers"))
            .arg(Arg::new("font").long("font"))
            .arg(Arg::new("config").long("config"))
            .arg(Arg::new("output").long("output"))
            .try_get_matches_from(argv)
            .unwrap()
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = parse(&["dflmark", "faces", "--workers", "3", "--font", "/tmp/f.ttf"]);
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.font_path, PathBuf::from("/tmp/f.ttf"));
        assert_eq!(input_dir_from_args(&args).unwrap(), PathBuf::from("faces"));
    }

    #[test]
    fn test_invalid_worker_count() {
        for bad in ["0", "many"] {
            let args = parse(&["dflmark", "faces", "--workers", bad]);
            assert!(matches!(config_from_args(&args), Err(WatermarkError::ConfigError(_))));
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let args = parse(&["dflmark", "faces", "verbose"]);
        assert!(DflmarkCommandFactory::new().create_command(&args).is_err());
    }

    #[test]
    fn test_config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dflmark.toml");
        std::fs::write(&path, "workers = 2\noutput_dir_name = \"marked\"\n").unwrap();

        let args = parse(&["dflmark", "faces", "--config", path.to_str().unwrap(), "--workers", "5"]);
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.output_dir_name, "marked");
        assert_eq!(config.workers, Some(5));
    }
}
