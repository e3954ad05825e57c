//! Tests for the JPEG reader

use std::io::Cursor;

use super::test_utils::{create_test_jpeg_buffer, encode_test_jpeg, push_segment};
use crate::errors::WatermarkError;
use crate::jpeg::constants::markers;
use crate::jpeg::JpegReader;

#[test]
fn test_read_hand_made_jpeg() {
    let mut cursor = Cursor::new(create_test_jpeg_buffer());
    let jpeg = JpegReader::new().read(&mut cursor).unwrap();

    assert_eq!(jpeg.segments.len(), 3);
    assert_eq!(jpeg.segments[0].marker, markers::APP0);
    assert!(jpeg.segments[0].data.starts_with(b"JFIF\0"));
    assert_eq!(jpeg.segments[2].marker, markers::SOS);
    assert_eq!(jpeg.scan_tail, vec![0x12, 0x34, 0xFF, 0x00, 0x56, 0xFF, 0xD9]);

    let frame = jpeg.frame_info().unwrap();
    assert_eq!(frame.width, 640);
    assert_eq!(frame.height, 480);
    assert_eq!(frame.components, 3);
    assert_eq!(frame.precision, 8);
}

#[test]
fn test_read_encoded_jpeg_frame() {
    let bytes = encode_test_jpeg(64, 32, [10, 20, 30]);
    let jpeg = JpegReader::new().read_bytes(&bytes).unwrap();

    let frame = jpeg.frame_info().unwrap();
    assert_eq!((frame.width, frame.height), (64, 32));
    assert!(jpeg.has_scan());
}

#[test]
fn test_png_is_not_jpeg() {
    let bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let result = JpegReader::new().read_bytes(&bytes);
    assert!(matches!(result, Err(WatermarkError::NotJpeg)));
}

#[test]
fn test_empty_input_is_not_jpeg() {
    let result = JpegReader::new().read_bytes(&[]);
    assert!(matches!(result, Err(WatermarkError::NotJpeg)));
}

#[test]
fn test_truncated_segment_is_invalid() {
    let mut buffer = vec![0xFF, 0xD8];
    buffer.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x20, 1, 2, 3]);

    let result = JpegReader::new().read_bytes(&buffer);
    assert!(matches!(result, Err(WatermarkError::InvalidJpeg(_))));
}

#[test]
fn test_fill_bytes_before_marker_are_skipped() {
    let mut buffer = vec![0xFF, 0xD8, 0xFF, 0xFF];
    push_segment(&mut buffer, 0xEF, b"payload");
    buffer.extend_from_slice(&[0xFF, 0xD9]);

    let jpeg = JpegReader::new().read_bytes(&buffer).unwrap();
    assert_eq!(jpeg.segments.len(), 1);
    assert_eq!(jpeg.segments[0].marker, markers::APP15);
    assert_eq!(jpeg.segments[0].data, b"payload".to_vec());
    assert!(!jpeg.has_scan());
}

#[test]
fn test_garbage_between_segments_is_invalid() {
    let mut buffer = vec![0xFF, 0xD8];
    push_segment(&mut buffer, 0xE0, b"JFIF\0");
    buffer.push(0x42);

    let result = JpegReader::new().read_bytes(&buffer);
    assert!(matches!(result, Err(WatermarkError::InvalidJpeg(_))));
}
