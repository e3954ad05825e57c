//! JPEG marker segment reader
//!
//! Walks the marker structure of a JPEG file up to the first scan.
//! Only the segment framing is interpreted; segment payloads and the
//! entropy-coded data are kept as raw bytes so the file can be written
//! back unchanged.

use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::io::seekable::{self, SeekableReader};
use crate::jpeg::constants::{self, markers};
use crate::jpeg::segment::Segment;
use crate::jpeg::types::JpegFile;

/// Upper bound on segments before the first scan
const MAX_SEGMENTS: usize = 4096;

/// Reader for JPEG marker segments
#[derive(Debug, Default)]
pub struct JpegReader;

impl JpegReader {
    /// Creates a new JPEG reader
    pub fn new() -> Self {
        JpegReader
    }

    /// Loads a JPEG file from the given path
    pub fn load(&self, path: &Path) -> WatermarkResult<JpegFile> {
        debug!("Loading JPEG file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);
        self.read(&mut reader)
    }

    /// Parses a JPEG held in memory
    pub fn read_bytes(&self, bytes: &[u8]) -> WatermarkResult<JpegFile> {
        let mut cursor = std::io::Cursor::new(bytes.to_vec());
        self.read(&mut cursor)
    }

    /// Reads a JPEG file from the given reader
    ///
    /// The reader must be positioned at the SOI marker. Returns
    /// `WatermarkError::NotJpeg` when the stream does not start with SOI.
    pub fn read(&self, reader: &mut dyn SeekableReader) -> WatermarkResult<JpegFile> {
        let soi = match reader.read_u16::<BigEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(WatermarkError::NotJpeg),
            Err(e) => return Err(e.into()),
        };
        if soi != u16::from_be_bytes([markers::PREFIX, markers::SOI]) {
            return Err(WatermarkError::NotJpeg);
        }

        let mut jpeg = JpegFile::new();

        loop {
            if jpeg.segments.len() >= MAX_SEGMENTS {
                return Err(WatermarkError::InvalidJpeg(format!(
                    "more than {} segments before scan data",
                    MAX_SEGMENTS
                )));
            }

            let marker = match self.next_marker(reader)? {
                Some(m) => m,
                None => {
                    debug!("JPEG ended without EOI after {} segments", jpeg.segments.len());
                    break;
                }
            };

            if marker == markers::EOI {
                debug!("Reached EOI before any scan");
                break;
            }

            if constants::is_standalone(marker) {
                jpeg.segments.push(Segment::new(marker, Vec::new()));
                continue;
            }

            let data = self.read_segment_payload(reader, marker)?;
            jpeg.segments.push(Segment::new(marker, data));

            if marker == markers::SOS {
                let remaining = seekable::remaining_len(reader)? as usize;
                let mut tail = Vec::with_capacity(remaining);
                reader.read_to_end(&mut tail)?;
                jpeg.scan_tail = tail;
                break;
            }
        }

        debug!(
            "Parsed {} JPEG segments, {} bytes of scan data",
            jpeg.segments.len(),
            jpeg.scan_tail.len()
        );
        Ok(jpeg)
    }

    /// Reads the next marker code, skipping 0xFF fill bytes
    ///
    /// Returns `None` at a clean end of stream.
    fn next_marker(&self, reader: &mut dyn SeekableReader) -> WatermarkResult<Option<u8>> {
        let prefix = match reader.read_u8() {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if prefix != markers::PREFIX {
            return Err(WatermarkError::InvalidJpeg(format!(
                "expected marker prefix, found {:#04x}",
                prefix
            )));
        }

        loop {
            let code = reader.read_u8().map_err(|e| truncated(e, "marker code"))?;
            if code != markers::PREFIX {
                return Ok(Some(code));
            }
        }
    }

    /// Reads the length field and payload of a segment
    fn read_segment_payload(
        &self,
        reader: &mut dyn SeekableReader,
        marker: u8,
    ) -> WatermarkResult<Vec<u8>> {
        let length = reader
            .read_u16::<BigEndian>()
            .map_err(|e| truncated(e, "segment length"))? as usize;
        if length < 2 {
            return Err(WatermarkError::InvalidJpeg(format!(
                "segment FF{:02X} has invalid length {}",
                marker, length
            )));
        }

        let mut data = vec![0u8; length - 2];
        reader
            .read_exact(&mut data)
            .map_err(|e| truncated(e, "segment payload"))?;
        Ok(data)
    }
}

fn truncated(error: std::io::Error, what: &str) -> WatermarkError {
    if error.kind() == ErrorKind::UnexpectedEof {
        WatermarkError::InvalidJpeg(format!("truncated {}", what))
    } else {
        WatermarkError::IoError(error)
    }
}
