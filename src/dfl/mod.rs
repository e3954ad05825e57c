//! DFL face-set container support
//!
//! DeepFaceLab JPEGs carry their metadata as a pickled Python `dict` in an
//! APP15 segment: facial landmarks, optional XSeg polygons, the encoded
//! XSeg mask and a number of other keys. This module reads that payload,
//! exposes the typed fields, and writes it into other JPEGs.

pub mod codec;
pub(crate) mod constants;
pub mod container;
pub mod framing;
pub mod ndarray;
pub mod pickle;
pub mod types;
#[cfg(test)]
mod tests;

pub use container::{DflJpeg, MetadataState};
pub use ndarray::NdArray;
pub use types::{DflFields, ImageShape, MetaMap, MetaValue, Point2, PolygonKind, RegionPolygon};
