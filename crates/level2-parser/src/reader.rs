//! Chunk decoding: volume header, record framing and message dispatch.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::cursor::ByteCursor;
use crate::error::Level2Result;
use crate::messages::{
    Message31, Message5, MessageHeader, CTM_HEADER_SIZE, DEFAULT_MESSAGE_SIZE,
    MESSAGE_HEADER_SIZE, MESSAGE_TYPE_RADIAL, MESSAGE_TYPE_VCP,
};
use crate::profile::FormatProfile;
use crate::record::{LdmRecord, RecordFramer};
use crate::volume_header::{VolumeHeader, ARCHIVE_TAPE_PREFIX, VOLUME_HEADER_SIZE};

/// Counters collected while decoding one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub records: usize,
    pub messages: usize,
    /// Messages of types other than 5 and 31.
    pub skipped_messages: usize,
    /// Radials abandoned after a decode error.
    pub failed_radials: usize,
    /// A record carried the negative-size end-of-volume flag.
    pub end_of_volume_marker: bool,
}

/// Everything decoded from one chunk.
#[derive(Debug, Clone)]
pub struct Level2Chunk {
    /// Present only for the first chunk of a volume (or a whole archive file).
    pub volume_header: Option<VolumeHeader>,
    pub profile: FormatProfile,
    /// First VCP message found in the chunk.
    pub vcp: Option<Message5>,
    /// Radials in stream order.
    pub radials: Vec<Message31>,
    pub stats: DecodeStats,
}

impl Level2Chunk {
    /// Site ICAO from the volume header, else from the first radial that names one.
    pub fn icao(&self) -> Option<String> {
        self.volume_header
            .as_ref()
            .and_then(|h| h.icao())
            .or_else(|| self.radials.iter().find_map(|r| r.icao()))
    }

    /// Pattern number of the chunk's VCP message, if one was decoded.
    pub fn vcp_number(&self) -> Option<u16> {
        self.vcp.as_ref().map(|v| v.pattern_number())
    }
}

/// Decoder for a single Level II chunk or archive file.
pub struct Level2Reader {
    data: Bytes,
}

impl Level2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Decode the whole chunk.
    ///
    /// Framing errors abort the chunk. Radial decode errors are logged and
    /// counted in [`DecodeStats::failed_radials`].
    pub fn decode(self) -> Level2Result<Level2Chunk> {
        let (volume_header, records_start) = read_volume_header(&self.data)?;
        let profile = volume_header
            .as_ref()
            .map(|h| FormatProfile::from_tape(&h.tape))
            .unwrap_or_default();

        let mut chunk = Level2Chunk {
            volume_header,
            profile,
            vcp: None,
            radials: Vec::new(),
            stats: DecodeStats::default(),
        };

        for record in RecordFramer::new(self.data, records_start) {
            let record = record?;
            chunk.stats.records += 1;
            chunk.stats.end_of_volume_marker |= record.end_of_volume_flag;
            dispatch_record(&record, &mut chunk);
        }

        debug!(
            records = chunk.stats.records,
            messages = chunk.stats.messages,
            radials = chunk.radials.len(),
            failed_radials = chunk.stats.failed_radials,
            vcp = ?chunk.vcp_number(),
            "Decoded Level II chunk"
        );

        Ok(chunk)
    }
}

/// Decode one chunk from raw bytes.
pub fn decode_chunk(data: Bytes) -> Level2Result<Level2Chunk> {
    Level2Reader::new(data).decode()
}

/// Parse the volume header if the chunk has one, returning where records start.
fn read_volume_header(data: &[u8]) -> Level2Result<(Option<VolumeHeader>, usize)> {
    if !data.starts_with(ARCHIVE_TAPE_PREFIX) {
        return Ok((None, 0));
    }

    let header = VolumeHeader::parse(data)?;
    debug!(
        version = %header.version(),
        site = ?header.icao(),
        date_time = %header.date_time(),
        "Read volume header"
    );
    Ok((Some(header), VOLUME_HEADER_SIZE))
}

/// Walk the message frames of one decompressed record.
fn dispatch_record(record: &LdmRecord, chunk: &mut Level2Chunk) {
    let data = &record.data[..];
    let mut frame_start = 0usize;

    while frame_start + CTM_HEADER_SIZE + MESSAGE_HEADER_SIZE <= data.len() {
        let mut cursor = ByteCursor::new(data);
        cursor.seek(frame_start + CTM_HEADER_SIZE);
        let header = match MessageHeader::decode(&mut cursor) {
            Ok(header) => header,
            Err(_) => break,
        };
        let body_start = cursor.position();
        chunk.stats.messages += 1;

        trace!(
            record_offset = record.offset,
            frame_start = frame_start,
            message_type = header.message_type,
            size = header.size_bytes(),
            "Dispatching message"
        );

        match header.message_type {
            MESSAGE_TYPE_RADIAL => {
                // Variable-length frame; a size smaller than the header
                // itself leaves no way to find the next message.
                let declared = header.size_bytes();
                if declared < MESSAGE_HEADER_SIZE {
                    chunk.stats.failed_radials += 1;
                    warn!(
                        record_offset = record.offset,
                        declared = declared,
                        "Radial declares an impossible size, abandoning record"
                    );
                    break;
                }

                // A radial never reads past its own frame.
                let frame_end = (frame_start + CTM_HEADER_SIZE + declared).min(data.len());
                decode_radial(&data[..frame_end], body_start, record.offset, chunk);
                frame_start += CTM_HEADER_SIZE + declared;
            }
            MESSAGE_TYPE_VCP => {
                decode_vcp(&mut cursor, record.offset, chunk);
                frame_start += DEFAULT_MESSAGE_SIZE;
            }
            _ => {
                chunk.stats.skipped_messages += 1;
                frame_start += DEFAULT_MESSAGE_SIZE;
            }
        }
    }
}

fn decode_radial(data: &[u8], start: usize, record_offset: usize, chunk: &mut Level2Chunk) {
    match Message31::decode(data, start, &chunk.profile) {
        Ok(radial) => chunk.radials.push(radial),
        Err(e) => {
            chunk.stats.failed_radials += 1;
            warn!(
                record_offset = record_offset,
                radial_start = start,
                error = %e,
                "Abandoning radial"
            );
        }
    }
}

fn decode_vcp(cursor: &mut ByteCursor<'_>, record_offset: usize, chunk: &mut Level2Chunk) {
    match Message5::decode(cursor) {
        Ok(vcp) => {
            if chunk.vcp.is_none() {
                debug!(
                    vcp = vcp.pattern_number(),
                    cuts = vcp.elevation_cuts.len(),
                    "Decoded volume coverage pattern"
                );
                chunk.vcp = Some(vcp);
            }
        }
        Err(e) => warn!(record_offset = record_offset, error = %e, "Skipping unreadable VCP message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Level2Error;

    #[test]
    fn test_headerless_chunk_starts_at_zero() {
        let (header, start) = read_volume_header(&[0, 0, 0, 0]).unwrap();
        assert!(header.is_none());
        assert_eq!(start, 0);
    }

    #[test]
    fn test_short_archive_header_is_framing_error() {
        let err = read_volume_header(b"AR2V0006.001").unwrap_err();
        assert!(matches!(err, Level2Error::TruncatedVolumeHeader(12)));
    }

    #[test]
    fn test_empty_chunk_decodes_to_nothing() {
        let chunk = decode_chunk(Bytes::new()).unwrap();
        assert!(chunk.volume_header.is_none());
        assert!(chunk.radials.is_empty());
        assert_eq!(chunk.stats, DecodeStats::default());
        assert_eq!(chunk.icao(), None);
    }

    #[test]
    fn test_unknown_messages_skip_a_whole_frame() {
        // Two fixed frames of message type 2, then a truncated tail.
        let mut stream = Vec::new();
        for _ in 0..2 {
            let mut frame = vec![0u8; DEFAULT_MESSAGE_SIZE];
            frame[CTM_HEADER_SIZE..CTM_HEADER_SIZE + 2].copy_from_slice(&1208u16.to_be_bytes());
            frame[CTM_HEADER_SIZE + 3] = 2;
            stream.extend(frame);
        }
        stream.extend_from_slice(&[0u8; 10]);

        let mut data = (stream.len() as i32).to_be_bytes().to_vec();
        data.extend(stream);

        let chunk = decode_chunk(Bytes::from(data)).unwrap();
        assert_eq!(chunk.stats.records, 1);
        assert_eq!(chunk.stats.messages, 2);
        assert_eq!(chunk.stats.skipped_messages, 2);
    }
}
