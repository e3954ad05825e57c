use byteorder::{BigEndian, WriteBytesExt};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// Appends a marker segment with its length field
pub fn push_segment(buffer: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    buffer.write_u8(0xFF).unwrap();
    buffer.write_u8(marker).unwrap();
    buffer.write_u16::<BigEndian>((payload.len() + 2) as u16).unwrap();
    buffer.extend_from_slice(payload);
}

/// Builds a minimal hand-made JPEG skeleton
///
/// SOI, APP0 (JFIF), SOF0 for a 640x480 3-component frame, SOS header,
/// a few bytes of fake scan data and EOI.
pub fn create_test_jpeg_buffer() -> Vec<u8> {
    let mut buffer = vec![0xFF, 0xD8];

    push_segment(&mut buffer, 0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");

    let mut sof = Vec::new();
    sof.write_u8(8).unwrap(); // Precision
    sof.write_u16::<BigEndian>(480).unwrap(); // Height
    sof.write_u16::<BigEndian>(640).unwrap(); // Width
    sof.write_u8(3).unwrap(); // Components
    for id in 1..=3u8 {
        sof.extend_from_slice(&[id, 0x11, 0]);
    }
    push_segment(&mut buffer, 0xC0, &sof);

    push_segment(&mut buffer, 0xDA, &[1, 1, 0, 0, 63, 0]);

    buffer.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
    buffer.extend_from_slice(&[0xFF, 0xD9]);
    buffer
}

/// Encodes a solid RGB image as a real JPEG
pub fn encode_test_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb(color));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}
