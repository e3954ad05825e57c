//! Seekable reader trait and helpers
//!
//! JPEG parsing reads marker segments sequentially but needs to know
//! how much data remains once the entropy-coded scan starts.

use std::io::{Read, Result, Seek, SeekFrom};

/// Trait for readers that can both read and seek
///
/// Both `BufReader<File>` and `Cursor<Vec<u8>>` satisfy it, so the same
/// parser handles files on disk and freshly encoded buffers.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Number of bytes between the current position and the end of the stream
///
/// The stream position is restored before returning.
pub fn remaining_len(reader: &mut dyn SeekableReader) -> Result<u64> {
    let current = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(current))?;
    Ok(end.saturating_sub(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_remaining_len_keeps_position() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        cursor.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(remaining_len(&mut cursor).unwrap(), 6);
        assert_eq!(cursor.position(), 4);
    }
}
