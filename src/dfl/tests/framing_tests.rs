//! Tests for locating and building the APP15 payload segment

use crate::dfl::framing::{find_payload, is_dfl_segment, payload_segment};
use crate::errors::WatermarkError;
use crate::jpeg::constants::{limits, markers};
use crate::jpeg::{JpegFile, Segment};

fn jpeg_with(segments: Vec<Segment>) -> JpegFile {
    let mut jpeg = JpegFile::new();
    jpeg.segments = segments;
    jpeg
}

#[test]
fn test_payload_is_the_whole_app15_body() {
    let jpeg = jpeg_with(vec![
        Segment::new(markers::APP0, b"JFIF\0".to_vec()),
        Segment::new(markers::APP15, b"\x80\x04N.".to_vec()),
    ]);
    assert_eq!(find_payload(&jpeg), Some(b"\x80\x04N.".as_slice()));
}

#[test]
fn test_first_app15_wins() {
    let jpeg = jpeg_with(vec![
        Segment::new(markers::APP15, vec![1]),
        Segment::new(markers::APP15, vec![2]),
    ]);
    assert_eq!(find_payload(&jpeg), Some([1u8].as_slice()));
}

#[test]
fn test_no_app15_segment() {
    let jpeg = jpeg_with(vec![Segment::new(markers::APP0, b"JFIF\0".to_vec())]);
    assert!(find_payload(&jpeg).is_none());
}

#[test]
fn test_payload_segment_fits_one_segment() {
    let segment = payload_segment(vec![0; limits::MAX_SEGMENT_PAYLOAD]).unwrap();
    assert!(is_dfl_segment(&segment));
    assert_eq!(segment.length_field(), Some(0xFFFF));
}

#[test]
fn test_oversized_payload_is_rejected() {
    let result = payload_segment(vec![0; limits::MAX_SEGMENT_PAYLOAD + 1]);
    assert!(matches!(result, Err(WatermarkError::InvalidMetadata(_))));
}
