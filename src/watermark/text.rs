//! Watermark font handling and text measurement

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use log::debug;
use std::path::Path;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::watermark::font_lookup::resolve_font_path;
use crate::watermark::placement::TextMetrics;

/// A parsed TrueType/OpenType font
pub struct WatermarkFont {
    font: FontVec,
}

impl WatermarkFont {
    /// Loads a font file
    ///
    /// A bare file name that does not exist in the working directory is
    /// looked up in the system font directories.
    pub fn load(path: &Path) -> WatermarkResult<Self> {
        let resolved = resolve_font_path(path).ok_or_else(|| {
            WatermarkError::FontError(format!("cannot find font {}", path.display()))
        })?;
        let data = std::fs::read(&resolved).map_err(|e| {
            WatermarkError::FontError(format!("cannot read {}: {}", resolved.display(), e))
        })?;
        debug!("Loaded font {} ({} bytes)", resolved.display(), data.len());
        Self::from_bytes(data)
    }

    /// Parses font data
    pub fn from_bytes(data: Vec<u8>) -> WatermarkResult<Self> {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| WatermarkError::FontError(format!("failed to parse font: {}", e)))?;
        Ok(WatermarkFont { font })
    }

    pub fn font(&self) -> &FontVec {
        &self.font
    }

    /// Scale at which one em is `em_size` pixels
    ///
    /// `PxScale` is the height of a line (ascent - descent), so the em size
    /// is converted through the font's units per em.
    pub fn scale_for_size(&self, em_size: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(em_size * self.font.height_unscaled() / units_per_em)
    }

    /// Measures text as drawn from a top-left origin
    ///
    /// The width is the right edge of the inked glyph bounds. The height is
    /// the bottom edge of the inked bounds plus the font's descent, so text
    /// placed `height` pixels above an edge clears it even for descenders.
    pub fn measure(&self, text: &str, scale: PxScale) -> TextMetrics {
        let scaled = self.font.as_scaled(scale);
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        let mut right = 0.0f32;
        let mut bottom = 0.0f32;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
            caret += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                right = right.max(bounds.max.x);
                bottom = bottom.max(bounds.max.y);
            }
        }

        let descent = scaled.descent().abs().round();
        TextMetrics {
            width: right.ceil().max(0.0) as u32,
            height: (bottom.ceil().max(0.0) + descent) as u32,
        }
    }
}

/// Locates a TrueType font installed on the test machine
#[cfg(test)]
pub(crate) fn find_test_font() -> Option<std::path::PathBuf> {
    const CANDIDATES: [&str; 5] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
    ];
    CANDIDATES
        .iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.exists())
}
