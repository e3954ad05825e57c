//! Command pattern interfaces

use clap::ArgMatches;

use crate::errors::WatermarkResult;

/// An executable CLI operation
pub trait Command {
    /// Execute the command
    fn execute(&self) -> WatermarkResult<()>;
}

/// Creates the command selected by the CLI arguments
pub trait CommandFactory {
    /// Create a new Command instance based on CLI arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A command that implements the Command trait, or an error
    fn create_command(&self, args: &ArgMatches) -> WatermarkResult<Box<dyn Command>>;
}
