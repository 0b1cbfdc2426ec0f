//! Level II message framing and message decoders.
//!
//! Within a decompressed LDM record, every message is preceded by a 12-byte
//! control (CTM) header and a 16-byte message header. Most message types sit
//! in a fixed 2432-byte frame; message 31 frames are variable and sized by the
//! header's half-word count.

pub mod message31;
pub mod message5;

use crate::cursor::ByteCursor;
use crate::error::Level2Result;

pub use message31::{
    AzimuthResolution, ElevationData, Message31, Message31Header, Moment, RadialCalibration,
    RadialData, RadialStatus, VolumeData,
};
pub use message5::{ElevationCut, Message5, Message5Header, Waveform};

/// Size of a fixed message frame, CTM header included.
pub const DEFAULT_MESSAGE_SIZE: usize = 2432;
/// Control header inserted ahead of each message.
pub const CTM_HEADER_SIZE: usize = 12;
/// Message header length.
pub const MESSAGE_HEADER_SIZE: usize = 16;
/// Body length of a fixed-frame message.
pub const MESSAGE_BODY_SIZE: usize = DEFAULT_MESSAGE_SIZE - CTM_HEADER_SIZE - MESSAGE_HEADER_SIZE;

/// Message type of the Volume Coverage Pattern.
pub const MESSAGE_TYPE_VCP: u8 = 5;
/// Message type of the generic digital radar data (radial).
pub const MESSAGE_TYPE_RADIAL: u8 = 31;

/// 16-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message size in half-words, header included.
    pub size: u16,
    pub channel: u8,
    pub message_type: u8,
    pub sequence_number: u16,
    pub julian_date: u16,
    pub day_ms: u32,
    pub segments: u16,
    pub segment_number: u16,
}

impl MessageHeader {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        cursor.require(MESSAGE_HEADER_SIZE, "message header")?;
        Ok(Self {
            size: cursor.read_u16("message header")?,
            channel: cursor.read_u8("message header")?,
            message_type: cursor.read_u8("message header")?,
            sequence_number: cursor.read_u16("message header")?,
            julian_date: cursor.read_u16("message header")?,
            day_ms: cursor.read_u32("message header")?,
            segments: cursor.read_u16("message header")?,
            segment_number: cursor.read_u16("message header")?,
        })
    }

    /// Declared message length in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size as usize * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_size() {
        assert_eq!(MESSAGE_BODY_SIZE, 2404);
    }

    #[test]
    fn test_decode_message_header() {
        let mut data = Vec::new();
        data.extend_from_slice(&1208u16.to_be_bytes());
        data.push(8);
        data.push(31);
        data.extend_from_slice(&17u16.to_be_bytes());
        data.extend_from_slice(&19_814u16.to_be_bytes());
        data.extend_from_slice(&1_000u32.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());

        let header = MessageHeader::decode(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(header.message_type, MESSAGE_TYPE_RADIAL);
        assert_eq!(header.size_bytes(), 2416);
        assert_eq!(header.sequence_number, 17);
        assert_eq!(header.segments, 1);
    }
}
