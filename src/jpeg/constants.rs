//! JPEG marker constants
//!
//! Marker codes are the second byte of each `FF xx` marker.

/// Marker codes
pub mod markers {
    /// Prefix byte of every marker
    pub const PREFIX: u8 = 0xFF;
    /// Start of image
    pub const SOI: u8 = 0xD8;
    /// End of image
    pub const EOI: u8 = 0xD9;
    /// Start of scan
    pub const SOS: u8 = 0xDA;
    /// Temporary private use, no payload
    pub const TEM: u8 = 0x01;
    /// First restart marker (RST0)
    pub const RST0: u8 = 0xD0;
    /// Last restart marker (RST7)
    pub const RST7: u8 = 0xD7;
    /// First application segment (APP0, JFIF)
    pub const APP0: u8 = 0xE0;
    /// Last application segment (APP15, carries the DFL payload)
    pub const APP15: u8 = 0xEF;
    /// First frame header (SOF0)
    pub const SOF0: u8 = 0xC0;
    /// Last frame header (SOF15)
    pub const SOF15: u8 = 0xCF;
    /// Huffman table definition (inside the SOF range, not a frame)
    pub const DHT: u8 = 0xC4;
    /// Reserved JPEG extension (inside the SOF range, not a frame)
    pub const JPG: u8 = 0xC8;
    /// Arithmetic coding conditioning (inside the SOF range, not a frame)
    pub const DAC: u8 = 0xCC;
}

/// Size limits of marker segments
pub mod limits {
    /// Largest value of the 16-bit length field
    pub const MAX_SEGMENT_LENGTH: usize = 0xFFFF;
    /// Largest payload a segment can carry (length field counts itself)
    pub const MAX_SEGMENT_PAYLOAD: usize = MAX_SEGMENT_LENGTH - 2;
}

/// Returns true for markers that are not followed by a length field
pub fn is_standalone(marker: u8) -> bool {
    marker == markers::TEM
        || marker == markers::SOI
        || marker == markers::EOI
        || (markers::RST0..=markers::RST7).contains(&marker)
}

/// Returns true for SOFn frame header markers
pub fn is_frame_header(marker: u8) -> bool {
    (markers::SOF0..=markers::SOF15).contains(&marker)
        && marker != markers::DHT
        && marker != markers::JPG
        && marker != markers::DAC
}

/// Returns true for APPn markers
pub fn is_app_segment(marker: u8) -> bool {
    (markers::APP0..=markers::APP15).contains(&marker)
}
