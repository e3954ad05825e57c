//! Per-file watermarking pipeline
//!
//! ```text
//! read metadata ─┬─ with data ──> decode mask -> place -> render -> write metadata
//!                └─ otherwise ──> render at fixed offset
//! ```
//!
//! Each call owns everything it opens; nothing is shared between files
//! except the read-only configuration and font.

use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::WatermarkConfig;
use crate::dfl::{DflJpeg, MetadataState};
use crate::errors::{WatermarkError, WatermarkResult};
use crate::watermark::mask::BinaryMask;
use crate::watermark::placement::{PlacementCoordinate, PlacementSelector, Quadrant};
use crate::watermark::renderer::Renderer;
use crate::watermark::text::WatermarkFont;

/// What happened to a successfully processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Metadata was found, the text went into the least busy corner and the
    /// metadata was carried over
    Watermarked {
        output: PathBuf,
        quadrant: Quadrant,
        coordinate: PlacementCoordinate,
    },
    /// No metadata; the text went to the fixed offset
    Fallback {
        output: PathBuf,
        coordinate: PlacementCoordinate,
    },
}

impl ProcessOutcome {
    pub fn output(&self) -> &Path {
        match self {
            ProcessOutcome::Watermarked { output, .. } => output,
            ProcessOutcome::Fallback { output, .. } => output,
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOutcome::Watermarked { output, quadrant, coordinate } => write!(
                f,
                "{} (metadata kept, {} at {})",
                output.display(),
                quadrant,
                coordinate
            ),
            ProcessOutcome::Fallback { output, coordinate } => {
                write!(f, "{} (no metadata, at {})", output.display(), coordinate)
            }
        }
    }
}

/// Runs the watermark pipeline for single files
pub struct Pipeline<'a> {
    config: &'a WatermarkConfig,
    font: &'a WatermarkFont,
    output_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline writing into `output_dir`
    pub fn new(config: &'a WatermarkConfig, font: &'a WatermarkFont, output_dir: &Path) -> Self {
        Pipeline {
            config,
            font,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Watermarks one file into the output directory
    pub fn process(&self, path: &Path) -> WatermarkResult<ProcessOutcome> {
        let file_name = path.file_name().ok_or_else(|| {
            WatermarkError::GenericError(format!("{} has no file name", path.display()))
        })?;
        let stem = watermark_text(path)?;
        let output = self.output_dir.join(file_name);

        debug!("Processing {}", path.display());
        match DflJpeg::load(path) {
            MetadataState::ContainerWithData(input) => self.process_with_metadata(path, &input, &stem, output),
            MetadataState::ContainerNoData => {
                warn!("No landmarks in {}, using fixed placement", path.display());
                self.process_fallback(path, &stem, output)
            }
            MetadataState::NotContainer => {
                info!("{} is not a DFL JPEG, using fixed placement", path.display());
                self.process_fallback(path, &stem, output)
            }
        }
    }

    fn process_with_metadata(
        &self,
        path: &Path,
        input: &DflJpeg,
        text: &str,
        output: PathBuf,
    ) -> WatermarkResult<ProcessOutcome> {
        let shape = input
            .shape()
            .ok_or_else(|| WatermarkError::InvalidMetadata("missing frame header".to_string()))?;
        let mask_bytes = input
            .mask()
            .ok_or_else(|| WatermarkError::InvalidMetadata("missing mask".to_string()))?;

        let mask = BinaryMask::decode(mask_bytes, shape.width, shape.height)?;

        let scale = self
            .font
            .scale_for_size(self.config.font_size_for_width(shape.width));
        let metrics = self.font.measure(text, scale);
        let placement = PlacementSelector::new(self.config.margin).select(&mask, metrics)?;

        let renderer = Renderer::new(self.font, self.config.text_color, self.config.jpeg_quality);
        let rendered = renderer.render_jpeg(path, text, placement.coordinate, scale)?;

        let mut out = DflJpeg::from_bytes(&output, &rendered)?;
        if let Some(dictionary) = input.dictionary() {
            out.set_dictionary(dictionary.clone());
        }
        if let Some(landmarks) = input.landmarks() {
            out.set_landmarks(landmarks.to_vec());
        }
        if let Some(polygons) = input.region_polygons() {
            out.set_region_polygons(polygons.to_vec());
        }
        out.set_mask(mask_bytes.to_vec());
        out.save()?;

        info!(
            "Watermarked {} in {} at {}",
            path.display(),
            placement.quadrant,
            placement.coordinate
        );
        Ok(ProcessOutcome::Watermarked {
            output,
            quadrant: placement.quadrant,
            coordinate: placement.coordinate,
        })
    }

    fn process_fallback(&self, path: &Path, text: &str, output: PathBuf) -> WatermarkResult<ProcessOutcome> {
        let (x, y) = self.config.fallback_offset;
        let coordinate = PlacementCoordinate::new(x, y);
        let scale = self.font.scale_for_size(self.config.fallback_font_size);

        let renderer = Renderer::new(self.font, self.config.text_color, self.config.jpeg_quality);
        renderer.render_to_file(path, &output, text, coordinate, scale)?;

        Ok(ProcessOutcome::Fallback { output, coordinate })
    }
}

/// The watermark text for a file: its name without the extension
pub fn watermark_text(path: &Path) -> WatermarkResult<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| WatermarkError::GenericError(format!("{} has no file stem", path.display())))
}
