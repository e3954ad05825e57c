//! JPEG marker segment writer
//!
//! Serializes a `JpegFile` back to bytes: SOI, each segment with its
//! length field, then the untouched scan data.

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::jpeg::constants::markers;
use crate::jpeg::types::JpegFile;

/// Handles writing JPEG files
pub struct JpegWriter;

impl JpegWriter {
    /// Writes a JPEG structure to any writer
    pub fn write(jpeg: &JpegFile, writer: &mut impl Write) -> WatermarkResult<()> {
        writer.write_all(&[markers::PREFIX, markers::SOI])?;

        for segment in &jpeg.segments {
            writer.write_u8(markers::PREFIX)?;
            writer.write_u8(segment.marker)?;
            if segment.is_standalone() {
                continue;
            }

            let length = segment.length_field().ok_or_else(|| {
                WatermarkError::InvalidJpeg(format!("segment {} exceeds 65533 bytes", segment))
            })?;
            writer.write_u16::<BigEndian>(length)?;
            writer.write_all(&segment.data)?;
        }

        if jpeg.scan_tail.is_empty() {
            writer.write_all(&[markers::PREFIX, markers::EOI])?;
        } else {
            writer.write_all(&jpeg.scan_tail)?;
        }

        Ok(())
    }

    /// Serializes a JPEG structure into a byte vector
    pub fn to_bytes(jpeg: &JpegFile) -> WatermarkResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(
            jpeg.scan_tail.len() + jpeg.segments.iter().map(|s| s.data.len() + 4).sum::<usize>() + 4,
        );
        Self::write(jpeg, &mut buffer)?;
        Ok(buffer)
    }

    /// Writes a JPEG structure to disk
    pub fn save(jpeg: &JpegFile, path: &Path) -> WatermarkResult<()> {
        debug!("Writing JPEG to {}", path.display());
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        Self::write(jpeg, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
