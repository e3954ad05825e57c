//! Core JPEG data structures

use std::fmt;

use crate::jpeg::constants;
use crate::jpeg::segment::Segment;

/// Frame header values read from the first SOFn segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Sample precision in bits
    pub precision: u8,
    /// Number of lines
    pub height: u16,
    /// Number of samples per line
    pub width: u16,
    /// Number of image components (1 for grayscale, 3 for YCbCr)
    pub components: u8,
}

/// A JPEG file split into marker segments
///
/// Everything up to and including the first SOS header is kept as
/// individual segments. The entropy-coded data that follows (including any
/// further markers of progressive scans and the final EOI) is kept verbatim
/// in `scan_tail`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegFile {
    /// Marker segments between SOI and the end of the first SOS header
    pub segments: Vec<Segment>,
    /// Raw bytes after the first SOS header
    pub scan_tail: Vec<u8>,
}

impl JpegFile {
    /// Creates an empty JPEG structure
    pub fn new() -> Self {
        JpegFile::default()
    }

    /// Returns the frame header of the first SOFn segment
    pub fn frame_info(&self) -> Option<FrameInfo> {
        let segment = self
            .segments
            .iter()
            .find(|s| constants::is_frame_header(s.marker))?;

        let data = &segment.data;
        if data.len() < 6 {
            return None;
        }

        Some(FrameInfo {
            precision: data[0],
            height: u16::from_be_bytes([data[1], data[2]]),
            width: u16::from_be_bytes([data[3], data[4]]),
            components: data[5],
        })
    }

    /// Returns all segments with the given marker, in file order
    pub fn segments_with_marker(&self, marker: u8) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.marker == marker).collect()
    }

    /// Removes every segment matching the predicate, returning how many were removed
    pub fn remove_segments<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Segment) -> bool,
    {
        let before = self.segments.len();
        self.segments.retain(|s| !predicate(s));
        before - self.segments.len()
    }

    /// Index just past the leading run of APPn segments
    ///
    /// New application segments go here so that JFIF/EXIF stay first.
    pub fn app_insert_position(&self) -> usize {
        self.segments
            .iter()
            .position(|s| !s.is_app())
            .unwrap_or(self.segments.len())
    }

    /// Inserts segments right after the leading APPn run
    pub fn insert_app_segments(&mut self, new_segments: Vec<Segment>) {
        let position = self.app_insert_position();
        self.segments.splice(position..position, new_segments);
    }

    /// Whether an SOS header was found
    pub fn has_scan(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.marker == constants::markers::SOS)
    }
}

impl fmt::Display for JpegFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "JPEG File:")?;
        if let Some(frame) = self.frame_info() {
            writeln!(
                f,
                "  Frame: {}x{}, {} components, {}-bit",
                frame.width, frame.height, frame.components, frame.precision
            )?;
        }
        for segment in &self.segments {
            writeln!(f, "  {}", segment)?;
        }
        writeln!(f, "  Scan data: {} bytes", self.scan_tail.len())
    }
}
