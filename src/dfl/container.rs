//! The DFL container: a JPEG carrying face-set metadata
//!
//! `DflJpeg` pairs a parsed JPEG with the decoded payload fields and
//! offers accessors and mutators for each of them. Loading never fails
//! on malformed metadata: the outcome is reported as a `MetadataState`.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::dfl::codec;
use crate::dfl::framing;
use crate::dfl::types::{DflFields, ImageShape, MetaMap, Point2, RegionPolygon};
use crate::errors::{WatermarkError, WatermarkResult};
use crate::jpeg::{JpegFile, JpegReader, JpegWriter};

/// Outcome of probing a file for DFL metadata
#[derive(Debug)]
pub enum MetadataState {
    /// Not a JPEG, or the file could not be read
    NotContainer,
    /// A JPEG without usable DFL metadata
    ContainerNoData,
    /// A JPEG whose dictionary, landmarks and mask all decoded
    ContainerWithData(Box<DflJpeg>),
}

/// A JPEG file together with its DFL payload
#[derive(Debug, Clone)]
pub struct DflJpeg {
    path: PathBuf,
    jpeg: JpegFile,
    fields: DflFields,
}

impl DflJpeg {
    /// Reads the DFL metadata of a file, if any
    ///
    /// Never returns an error: unreadable files and non-JPEGs become
    /// `NotContainer`, malformed or partial payloads become `ContainerNoData`.
    pub fn load(path: &Path) -> MetadataState {
        let jpeg = match JpegReader::new().load(path) {
            Ok(jpeg) => jpeg,
            Err(WatermarkError::NotJpeg) => {
                debug!("{} is not a JPEG", path.display());
                return MetadataState::NotContainer;
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return MetadataState::NotContainer;
            }
        };

        let container = match Self::from_jpeg(path, jpeg) {
            Ok(container) => container,
            Err(e) => {
                warn!("Ignoring malformed DFL metadata in {}: {}", path.display(), e);
                return MetadataState::ContainerNoData;
            }
        };

        if let Err(reason) = container.validate() {
            warn!("No usable DFL metadata in {}: {}", path.display(), reason);
            return MetadataState::ContainerNoData;
        }

        info!(
            "Loaded DFL metadata from {}: {} landmarks, shape {}",
            path.display(),
            container.landmarks().map_or(0, |l| l.len()),
            container.shape().map_or_else(|| "unknown".to_string(), |s| s.to_string())
        );
        MetadataState::ContainerWithData(Box::new(container))
    }

    /// Creates a container from in-memory JPEG bytes, addressed at `path`
    ///
    /// Any DFL payload already present in the bytes is decoded; a JPEG
    /// without one yields a container with empty fields.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> WatermarkResult<Self> {
        let jpeg = JpegReader::new().read_bytes(bytes)?;
        Self::from_jpeg(path, jpeg)
    }

    fn from_jpeg(path: &Path, jpeg: JpegFile) -> WatermarkResult<Self> {
        let fields = match framing::find_payload(&jpeg) {
            Some(payload) => codec::decode_payload(payload)?,
            None => DflFields::default(),
        };

        Ok(DflJpeg {
            path: path.to_path_buf(),
            jpeg,
            fields,
        })
    }

    /// Checks that the fields form complete metadata
    fn validate(&self) -> Result<(), &'static str> {
        if self.fields.is_empty() {
            return Err("no DFL payload");
        }
        if self.fields.dictionary.is_none() {
            return Err("dictionary missing");
        }
        if self.fields.landmarks.is_none() {
            return Err("landmarks missing");
        }
        if !self.has_data() {
            return Err("landmark list is empty");
        }
        if self.fields.mask.is_none() {
            return Err("mask missing");
        }
        if self.shape().is_none() {
            return Err("JPEG has no frame header");
        }
        Ok(())
    }

    /// Whether landmarks are present
    pub fn has_data(&self) -> bool {
        self.fields.landmarks.as_ref().is_some_and(|l| !l.is_empty())
    }

    /// Pixel shape from the JPEG frame header
    pub fn shape(&self) -> Option<ImageShape> {
        self.jpeg.frame_info().map(|frame| ImageShape {
            width: frame.width as u32,
            height: frame.height as u32,
            channels: frame.components,
        })
    }

    pub fn dictionary(&self) -> Option<&MetaMap> {
        self.fields.dictionary.as_ref()
    }

    pub fn set_dictionary(&mut self, dictionary: MetaMap) {
        self.fields.dictionary = Some(dictionary);
    }

    pub fn landmarks(&self) -> Option<&[Point2]> {
        self.fields.landmarks.as_deref()
    }

    pub fn set_landmarks(&mut self, landmarks: Vec<Point2>) {
        self.fields.landmarks = Some(landmarks);
    }

    pub fn has_region_polygons(&self) -> bool {
        self.fields.region_polygons.is_some()
    }

    pub fn region_polygons(&self) -> Option<&[RegionPolygon]> {
        self.fields.region_polygons.as_deref()
    }

    pub fn set_region_polygons(&mut self, polygons: Vec<RegionPolygon>) {
        self.fields.region_polygons = Some(polygons);
    }

    /// The compressed auxiliary mask, as stored
    pub fn mask(&self) -> Option<&[u8]> {
        self.fields.mask.as_deref()
    }

    pub fn set_mask(&mut self, mask: Vec<u8>) {
        self.fields.mask = Some(mask);
    }

    /// Serializes the JPEG with the current fields embedded
    ///
    /// Existing APP15 segments are replaced by one holding the pickled
    /// dictionary; other segments are kept in place.
    pub fn to_bytes(&self) -> WatermarkResult<Vec<u8>> {
        let mut jpeg = self.jpeg.clone();
        let removed = jpeg.remove_segments(framing::is_dfl_segment);
        if removed > 0 {
            debug!("Replacing {} existing DFL segments", removed);
        }

        if !self.fields.is_empty() {
            let payload = codec::encode_payload(&self.fields)?;
            jpeg.insert_app_segments(vec![framing::payload_segment(payload)?]);
        }

        JpegWriter::to_bytes(&jpeg)
    }

    /// Writes the container to its path
    pub fn save(&self) -> WatermarkResult<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(&self.path, bytes)?;
        info!("Saved DFL JPEG to {}", self.path.display());
        Ok(())
    }
}
