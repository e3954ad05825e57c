//! Batch processing of image directories
//!
//! Scans a directory for images and runs the watermark pipeline over
//! them on a fixed-size worker pool.

pub mod runner;
pub mod scanner;

pub use runner::{BatchReport, BatchRunner, FileFailure};
pub use scanner::scan_image_paths;
