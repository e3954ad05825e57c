//! JPEG marker segment handling
//!
//! This module provides structures and functions for splitting a JPEG
//! file into marker segments and writing it back, which is all the
//! DFL container needs from the host format.

pub mod constants;
pub mod reader;
pub mod segment;
pub mod types;
pub mod writer;
#[cfg(test)]
mod tests;

pub use reader::JpegReader;
pub use segment::Segment;
pub use types::{FrameInfo, JpegFile};
pub use writer::JpegWriter;
