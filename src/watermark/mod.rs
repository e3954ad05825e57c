//! Watermark placement and rendering
//!
//! This module turns a DFL mask into a text position and burns the
//! file name into the image.

pub mod font_lookup;
pub mod mask;
pub mod pipeline;
pub mod placement;
pub mod renderer;
pub mod text;

pub use mask::BinaryMask;
pub use pipeline::{Pipeline, ProcessOutcome};
pub use placement::{Placement, PlacementCoordinate, PlacementSelector, Quadrant, QuadrantSums, TextMetrics};
pub use renderer::Renderer;
pub use text::WatermarkFont;
