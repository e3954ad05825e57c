//! A single JPEG marker segment

use std::fmt;

use crate::jpeg::constants::{self, limits};

/// A marker segment as found in the file, without the `FF` prefix
/// and without the length field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker code (e.g. 0xE0 for APP0)
    pub marker: u8,
    /// Segment payload, empty for standalone markers
    pub data: Vec<u8>,
}

impl Segment {
    /// Creates a new segment
    pub fn new(marker: u8, data: Vec<u8>) -> Self {
        Segment { marker, data }
    }

    /// Whether this marker carries no length field
    pub fn is_standalone(&self) -> bool {
        constants::is_standalone(self.marker)
    }

    /// Whether this is an APPn segment
    pub fn is_app(&self) -> bool {
        constants::is_app_segment(self.marker)
    }

    /// Value of the length field when written
    pub fn length_field(&self) -> Option<u16> {
        if self.data.len() > limits::MAX_SEGMENT_PAYLOAD {
            return None;
        }
        Some((self.data.len() + 2) as u16)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FF{:02X} ({} bytes)", self.marker, self.data.len())
    }
}
