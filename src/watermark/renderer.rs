//! Burns the watermark text into an image and encodes the result

use ab_glyph::PxScale;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, Rgba};
use imageproc::drawing::draw_text_mut;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::WatermarkResult;
use crate::watermark::placement::PlacementCoordinate;
use crate::watermark::text::WatermarkFont;

/// Draws watermark text with a fixed font and color
pub struct Renderer<'a> {
    font: &'a WatermarkFont,
    color: Rgba<u8>,
    jpeg_quality: u8,
}

impl<'a> Renderer<'a> {
    pub fn new(font: &'a WatermarkFont, color: [u8; 3], jpeg_quality: u8) -> Self {
        Renderer {
            font,
            color: Rgba([color[0], color[1], color[2], 255]),
            jpeg_quality,
        }
    }

    /// Returns a copy of `image` with the text drawn at `at`
    ///
    /// Images with an alpha channel come back as RGBA, all others as RGB.
    /// 16-bit inputs are drawn and returned at 16 bits per channel; every
    /// other depth, floating point included, comes back at 8 bits.
    pub fn draw(&self, image: &DynamicImage, text: &str, at: PlacementCoordinate, scale: PxScale) -> DynamicImage {
        let keep_alpha = image.color().has_alpha();

        if is_sixteen_bit(image.color()) {
            let color = Rgba(self.color.0.map(|c| c as u16 * 257));
            let mut canvas = image.to_rgba16();
            draw_text_mut(&mut canvas, color, at.x, at.y, scale, self.font.font(), text);

            let drawn = DynamicImage::ImageRgba16(canvas);
            return if keep_alpha {
                drawn
            } else {
                DynamicImage::ImageRgb16(drawn.to_rgb16())
            };
        }

        let mut canvas = image.to_rgba8();
        draw_text_mut(&mut canvas, self.color, at.x, at.y, scale, self.font.font(), text);

        let drawn = DynamicImage::ImageRgba8(canvas);
        if keep_alpha {
            drawn
        } else {
            DynamicImage::ImageRgb8(drawn.to_rgb8())
        }
    }

    /// Watermarks the image at `source` and returns it as JPEG bytes
    pub fn render_jpeg(
        &self,
        source: &Path,
        text: &str,
        at: PlacementCoordinate,
        scale: PxScale,
    ) -> WatermarkResult<Vec<u8>> {
        let image = image::open(source)?;
        let drawn = self.draw(&image, text, at, scale);

        let mut bytes = Vec::new();
        encode_jpeg(&drawn, &mut bytes, self.jpeg_quality)?;
        debug!("Rendered {} to {} JPEG bytes", source.display(), bytes.len());
        Ok(bytes)
    }

    /// Watermarks the image at `source` and writes it to `output`
    ///
    /// The output format follows the output file extension.
    pub fn render_to_file(
        &self,
        source: &Path,
        output: &Path,
        text: &str,
        at: PlacementCoordinate,
        scale: PxScale,
    ) -> WatermarkResult<()> {
        let image = image::open(source)?;
        let drawn = self.draw(&image, text, at, scale);
        let format = ImageFormat::from_path(output)?;

        if format == ImageFormat::Jpeg {
            let mut writer = BufWriter::new(File::create(output)?);
            encode_jpeg(&drawn, &mut writer, self.jpeg_quality)?;
            writer.flush()?;
        } else {
            drawn.save_with_format(output, format)?;
        }

        info!("Wrote {}", output.display());
        Ok(())
    }
}

fn is_sixteen_bit(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16
    )
}

/// Encodes an image as baseline JPEG
///
/// The encoder keeps full chroma resolution (1x1 sampling on every
/// component), so `quality` is the only source of loss.
pub fn encode_jpeg<W: Write>(image: &DynamicImage, writer: W, quality: u8) -> WatermarkResult<()> {
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(writer, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::constants::markers;
    use crate::jpeg::JpegReader;
    use crate::watermark::text::find_test_font;
    use image::{ImageBuffer, Rgb, RgbImage, RgbaImage};
    use tempfile::TempDir;

    const MAGENTA: [u8; 3] = [255, 0, 221];

    fn test_font() -> Option<WatermarkFont> {
        Some(WatermarkFont::load(&find_test_font()?).unwrap())
    }

    /// Whether any pixel in the rectangle differs from the black background
    fn has_ink(image: &RgbImage, x0: u32, x1: u32, y0: u32, y1: u32) -> bool {
        (y0..y1).any(|y| (x0..x1).any(|x| image.get_pixel(x, y).0 != [0, 0, 0]))
    }

    #[test]
    fn test_draw_marks_only_text_area() {
        let Some(font) = test_font() else {
            eprintln!("No system font found, skipping");
            return;
        };
        let renderer = Renderer::new(&font, MAGENTA, 100);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 60, image::Rgb([0, 0, 0])));
        let scale = font.scale_for_size(16.0);
        let metrics = font.measure("HELLO", scale);

        let drawn = renderer.draw(&image, "HELLO", PlacementCoordinate::new(5, 5), scale).to_rgb8();

        assert!(has_ink(&drawn, 5, 5 + metrics.width, 5, 5 + metrics.height));
        assert!(!has_ink(&drawn, 0, 120, 5 + metrics.height + 1, 60));
        assert!(!has_ink(&drawn, 5 + metrics.width + 2, 120, 0, 60));
        assert!(!has_ink(&drawn, 0, 4, 0, 60));

        let strongest = drawn.pixels().max_by_key(|p| p.0[0]).unwrap();
        assert!(strongest.0[0] > 200 && strongest.0[1] == 0 && strongest.0[2] > 150);
    }

    #[test]
    fn test_draw_keeps_alpha_when_present() {
        let Some(font) = test_font() else {
            eprintln!("No system font found, skipping");
            return;
        };
        let renderer = Renderer::new(&font, MAGENTA, 100);
        let scale = font.scale_for_size(11.0);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(20, 20));
        assert!(renderer.draw(&rgba, "a", PlacementCoordinate::new(0, 0), scale).color().has_alpha());

        let rgb = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        assert!(!renderer.draw(&rgb, "a", PlacementCoordinate::new(0, 0), scale).color().has_alpha());
    }

    #[test]
    fn test_encode_jpeg_decodes_to_same_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(33, 17, image::Rgb([10, 200, 30])));
        let mut bytes = Vec::new();
        encode_jpeg(&image, &mut bytes, 100).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
        let pixel = decoded.to_rgb8().get_pixel(16, 8).0;
        assert!(pixel.iter().zip([10u8, 200, 30]).all(|(a, b)| (*a as i16 - b as i16).abs() <= 3));
    }

    #[test]
    fn test_encode_jpeg_keeps_full_chroma_resolution() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 16, image::Rgb([200, 40, 90])));
        let mut bytes = Vec::new();
        encode_jpeg(&image, &mut bytes, 100).unwrap();

        let jpeg = JpegReader::new().read_bytes(&bytes).unwrap();
        let frames = jpeg.segments_with_marker(markers::SOF0);
        assert_eq!(frames.len(), 1);

        // precision, height, width, component count, then (id, sampling, table) per component
        let frame = &frames[0].data;
        assert_eq!(frame[5], 3);
        let sampling: Vec<u8> = frame[6..].chunks_exact(3).map(|component| component[1]).collect();
        assert_eq!(sampling, vec![0x11, 0x11, 0x11]);
    }

    #[test]
    fn test_sixteen_bit_images_stay_sixteen_bit() {
        let Some(font) = test_font() else {
            eprintln!("No system font found, skipping");
            return;
        };
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("deep.png");
        let output = dir.path().join("marked.png");
        let deep: ImageBuffer<Rgb<u16>, Vec<u16>> = ImageBuffer::from_pixel(60, 30, Rgb([0, 0, 300]));
        DynamicImage::ImageRgb16(deep).save(&source).unwrap();

        let renderer = Renderer::new(&font, MAGENTA, 100);
        let scale = font.scale_for_size(16.0);
        renderer
            .render_to_file(&source, &output, "00001", PlacementCoordinate::new(2, 2), scale)
            .unwrap();

        let marked = image::open(&output).unwrap();
        assert_eq!(marked.color(), ColorType::Rgb16);
        let pixels = marked.to_rgb16();
        assert_eq!(pixels.get_pixel(59, 29).0, [0, 0, 300]);
        let strongest = pixels.pixels().max_by_key(|p| p.0[0]).unwrap();
        assert!(strongest.0[0] > 50_000 && strongest.0[1] == 0);
    }
}
