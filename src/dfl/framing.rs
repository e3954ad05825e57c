//! Placement of the DFL payload in the JPEG
//!
//! DeepFaceLab writes the pickled dictionary as the whole body of a single
//! APP15 segment, with no identifier, after the last APPn segment.

use log::debug;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::jpeg::constants::{limits, markers};
use crate::jpeg::{JpegFile, Segment};

/// Whether a segment carries the DFL payload
pub fn is_dfl_segment(segment: &Segment) -> bool {
    segment.marker == markers::APP15
}

/// The payload of the first APP15 segment, if any
pub fn find_payload(jpeg: &JpegFile) -> Option<&[u8]> {
    let segments = jpeg.segments_with_marker(markers::APP15);
    if segments.len() > 1 {
        debug!("{} APP15 segments present, reading the first", segments.len());
    }
    segments.first().map(|segment| segment.data.as_slice())
}

/// Wraps a pickled payload in an APP15 segment
pub fn payload_segment(payload: Vec<u8>) -> WatermarkResult<Segment> {
    if payload.len() > limits::MAX_SEGMENT_PAYLOAD {
        return Err(WatermarkError::InvalidMetadata(format!(
            "pickled metadata is {} bytes, more than one APP15 segment holds ({})",
            payload.len(),
            limits::MAX_SEGMENT_PAYLOAD
        )));
    }
    Ok(Segment::new(markers::APP15, payload))
}
