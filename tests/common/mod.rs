//! Fixtures shared by the integration tests

#![allow(dead_code)]

use dflmark::dfl::framing::payload_segment;
use dflmark::dfl::{MetaMap, MetaValue, Point2, PolygonKind, RegionPolygon};
use dflmark::jpeg::{JpegReader, JpegWriter};
use dflmark::{DflJpeg, WatermarkConfig};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageFormat, Luma, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Locates a TrueType font installed on the test machine
pub fn find_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

/// Default configuration using the system test font
pub fn test_config(font: &Path) -> WatermarkConfig {
    WatermarkConfig {
        font_path: font.to_path_buf(),
        workers: Some(2),
        ..WatermarkConfig::default()
    }
}

pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([40, 40, 40]));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 95)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// PNG bytes of a black mask with one white square
pub fn block_mask_png(width: u32, height: u32, x0: u32, y0: u32, size: u32) -> Vec<u8> {
    let mask = GrayImage::from_fn(width, height, |x, y| {
        let inside = (x0..x0 + size).contains(&x) && (y0..y0 + size).contains(&y);
        Luma([if inside { 255 } else { 0 }])
    });
    let mut cursor = Cursor::new(Vec::new());
    mask.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}

pub fn dictionary() -> MetaMap {
    let mut dictionary = MetaMap::new();
    dictionary.insert("face_type".to_string(), MetaValue::Str("whole_face".to_string()));
    dictionary.insert("source_filename".to_string(), MetaValue::Str("frame_0042.png".to_string()));
    dictionary.insert(
        "source_rect".to_string(),
        MetaValue::List(vec![MetaValue::Int(3), MetaValue::Int(4), MetaValue::Int(201), MetaValue::Int(202)]),
    );
    dictionary.insert("flipped".to_string(), MetaValue::Bool(true));
    dictionary
}

pub fn landmarks() -> Vec<Point2> {
    (0..68).map(|i| Point2::new(20.0 + i as f64, 180.0 - i as f64 * 0.5)).collect()
}

pub fn polygons() -> Vec<RegionPolygon> {
    vec![RegionPolygon::new(
        PolygonKind::Include,
        vec![Point2::new(0.0, 0.0), Point2::new(99.5, 0.0), Point2::new(50.0, 80.25)],
    )]
}

/// Writes a DFL JPEG with dictionary, landmarks, polygons and `mask_png`
pub fn write_dfl_jpeg(path: &Path, width: u32, height: u32, mask_png: Vec<u8>) {
    let mut container = DflJpeg::from_bytes(path, &encode_jpeg(width, height)).unwrap();
    container.set_dictionary(dictionary());
    container.set_landmarks(landmarks());
    container.set_region_polygons(polygons());
    container.set_mask(mask_png);
    container.save().unwrap();
}

/// Reads a file from `tests/fixtures`
pub fn fixture(name: &str) -> Vec<u8> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name].iter().collect();
    fs::read(&path).unwrap()
}

/// Writes a JPEG whose APP15 segment holds `payload` unchanged
pub fn write_jpeg_with_payload(path: &Path, width: u32, height: u32, payload: Vec<u8>) {
    let mut jpeg = JpegReader::new().read_bytes(&encode_jpeg(width, height)).unwrap();
    jpeg.insert_app_segments(vec![payload_segment(payload).unwrap()]);
    JpegWriter::save(&jpeg, path).unwrap();
}
