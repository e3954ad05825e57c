//! Binary mask decoding
//!
//! The auxiliary mask is stored as a compressed raster. Only pixels at the
//! brightest value of their depth count as set; everything else, including
//! anti-aliased edges, counts as clear.

use image::DynamicImage;
use log::debug;

use crate::errors::{WatermarkError, WatermarkResult};

/// A width x height grid of 0/1 cells, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl BinaryMask {
    /// Creates a mask from row-major cells
    pub fn new(width: u32, height: u32, cells: Vec<u8>) -> WatermarkResult<Self> {
        if cells.len() != width as usize * height as usize {
            return Err(WatermarkError::GenericError(format!(
                "mask of {}x{} needs {} cells, got {}",
                width,
                height,
                width as usize * height as usize,
                cells.len()
            )));
        }
        Ok(BinaryMask {
            width,
            height,
            cells: cells.into_iter().map(|c| u8::from(c != 0)).collect(),
        })
    }

    /// Creates a mask by evaluating `f(x, y)` for every cell
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(u8::from(f(x, y)));
            }
        }
        BinaryMask { width, height, cells }
    }

    /// Decodes a compressed mask and checks it against the declared shape
    ///
    /// Fails with `MaskShapeMismatch` when the decoded raster is not exactly
    /// `width` x `height`.
    pub fn decode(compressed: &[u8], width: u32, height: u32) -> WatermarkResult<Self> {
        let image = image::load_from_memory(compressed)?;
        debug!(
            "Decoded mask: {}x{} {:?}",
            image.width(),
            image.height(),
            image.color()
        );

        if (image.width(), image.height()) != (width, height) {
            return Err(WatermarkError::MaskShapeMismatch {
                expected: (width, height),
                actual: (image.width(), image.height()),
            });
        }

        Ok(Self::threshold(&image))
    }

    /// Reduces an image to one channel and keeps only fully bright pixels
    pub fn threshold(image: &DynamicImage) -> Self {
        let color = image.color();
        let bits_per_channel = color.bits_per_pixel() / color.channel_count() as u16;
        let (width, height) = (image.width(), image.height());

        let cells: Vec<u8> = match bits_per_channel {
            16 => image
                .to_luma16()
                .pixels()
                .map(|p| u8::from(p.0[0] == u16::MAX))
                .collect(),
            32 => image
                .to_luma32f()
                .pixels()
                .map(|p| u8::from(p.0[0] >= 1.0))
                .collect(),
            _ => image
                .to_luma8()
                .pixels()
                .map(|p| u8::from(p.0[0] == u8::MAX))
                .collect(),
        };

        BinaryMask { width, height, cells }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Value of the cell at (x, y)
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Number of set cells in the whole grid
    pub fn count_ones(&self) -> u64 {
        self.cells.iter().map(|&c| c as u64).sum()
    }

    /// Number of set cells in the half-open rectangle `[x0, x1) x [y0, y1)`
    pub fn count_in(&self, x0: u32, x1: u32, y0: u32, y1: u32) -> u64 {
        let width = self.width as usize;
        (y0..y1)
            .map(|y| {
                let row = y as usize * width;
                self.cells[row + x0 as usize..row + x1 as usize]
                    .iter()
                    .map(|&c| c as u64)
                    .sum::<u64>()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_only_full_white_counts() {
        let gray = GrayImage::from_fn(4, 2, |x, _| Luma([[0, 128, 254, 255][x as usize]]));
        let mask = BinaryMask::decode(&png_bytes(&DynamicImage::ImageLuma8(gray)), 4, 2).unwrap();

        assert_eq!(mask.count_ones(), 2);
        assert_eq!(mask.get(3, 0), 1);
        assert_eq!(mask.get(2, 1), 0);
    }

    #[test]
    fn test_sixteen_bit_threshold_is_max_value() {
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(2, 2, |x, y| if x == y { Luma([u16::MAX]) } else { Luma([255]) });
        let mask = BinaryMask::threshold(&DynamicImage::ImageLuma16(gray));
        assert_eq!(mask.count_ones(), 2);
    }

    #[test]
    fn test_rgb_mask_is_reduced_to_luma() {
        let rgb = RgbImage::from_fn(2, 2, |x, _| if x == 0 { Rgb([255, 255, 255]) } else { Rgb([255, 0, 0]) });
        let mask = BinaryMask::threshold(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(mask.count_ones(), 2);
        assert_eq!(mask.get(0, 1), 1);
        assert_eq!(mask.get(1, 1), 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let gray = GrayImage::new(8, 8);
        let result = BinaryMask::decode(&png_bytes(&DynamicImage::ImageLuma8(gray)), 16, 8);
        match result {
            Err(WatermarkError::MaskShapeMismatch { expected, actual }) => {
                assert_eq!(expected, (16, 8));
                assert_eq!(actual, (8, 8));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_mask_is_an_image_error() {
        let result = BinaryMask::decode(b"not an image", 8, 8);
        assert!(matches!(result, Err(WatermarkError::ImageError(_))));
    }

    #[test]
    fn test_count_in_rectangle() {
        let mask = BinaryMask::from_fn(6, 4, |x, y| x < 2 && y < 2);
        assert_eq!(mask.count_in(0, 3, 0, 2), 4);
        assert_eq!(mask.count_in(3, 6, 0, 4), 0);
        assert_eq!(mask.count_ones(), 4);
    }

    #[test]
    fn test_new_checks_cell_count() {
        assert!(BinaryMask::new(2, 2, vec![0, 1, 0]).is_err());
        let mask = BinaryMask::new(2, 1, vec![0, 7]).unwrap();
        assert_eq!(mask.get(1, 0), 1);
    }
}
