//! Filename watermarking for DFL face-set images
//!
//! Images carrying DFL metadata get their file name drawn into the corner
//! least covered by the face mask, and the metadata is written back into
//! the output. All other images are stamped at a fixed offset.

pub mod api;
pub mod batch;
pub mod commands;
pub mod config;
pub mod dfl;
pub mod errors;
pub mod io;
pub mod jpeg;
pub mod utils;
pub mod watermark;

pub use crate::api::Watermarker;

pub use batch::{BatchReport, FileFailure};
pub use config::WatermarkConfig;
pub use dfl::{DflJpeg, MetadataState};
pub use errors::{WatermarkError, WatermarkResult};
pub use watermark::{ProcessOutcome, Quadrant};
