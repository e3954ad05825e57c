//! I/O helpers shared by the container readers
//!
//! This module provides the reader abstraction used when parsing
//! JPEG marker segments from files or in-memory buffers.

pub mod seekable;
