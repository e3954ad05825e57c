//! Logger setup for the command line tool
//!
//! `Logger` sits behind the `log` facade and copies every record to a log
//! file as well as the console. Without a log file, `env_logger` is used.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{WatermarkError, WatermarkResult};

/// File-backed logger
pub struct Logger {
    file: Mutex<Option<File>>,
    level: LevelFilter,
    echo: bool,
}

impl Logger {
    /// Creates a logger writing to `log_file`, truncating it
    pub fn new(log_file: &Path, level: LevelFilter) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
            echo: true,
        })
    }

    /// Stops records from being printed to the console
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Appends one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Installs a file logger as the global `log` backend
    pub fn init_global_logger(log_file: &Path, level: LevelFilter) -> WatermarkResult<()> {
        let logger = Logger::new(log_file, level)?;
        log::set_boxed_logger(Box::new(logger))
            .map_err(|e| WatermarkError::GenericError(format!("logger already initialized: {}", e)))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.write_line(&message);

            if self.echo {
                eprintln!("{}", message);
            }
        }
    }

    fn flush(&self) {}
}

/// Sets up logging for the binary
///
/// With `log_file` the file logger is installed, otherwise `env_logger`
/// honoring `RUST_LOG`. `verbose` lowers the default level to debug.
pub fn init_logging(log_file: Option<&Path>, verbose: bool) -> WatermarkResult<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    match log_file {
        Some(path) => Logger::init_global_logger(path, level),
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
            .try_init()
            .map_err(|e| WatermarkError::GenericError(format!("logger already initialized: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use tempfile::tempdir;

    #[test]
    fn test_logger_writes_formatted_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dflmark.log");
        let logger = Logger::new(&path, LevelFilter::Info).unwrap().quiet();

        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("no landmarks in {}", "a.jpg"))
                .build(),
        );
        logger.log(&Record::builder().level(Level::Debug).args(format_args!("hidden")).build());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[WARN] no landmarks in a.jpg\n");
    }
}
