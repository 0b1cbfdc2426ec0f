//! LDM record framing.
//!
//! Each record is a signed 32-bit size followed by either a bzip2 stream
//! (introduced by the `BZ` magic) or raw message bytes. The sign bit has
//! historically flagged the last record of a volume; it is reported but never
//! used to stop reading, since real-time chunks end without setting it.

use bytes::Bytes;
use std::io::Read;
use tracing::debug;

use crate::error::{Level2Error, Level2Result};

/// Magic bytes introducing a bzip2-compressed record.
pub const BZIP2_MAGIC: &[u8; 2] = b"BZ";

/// One decoded LDM record.
#[derive(Debug, Clone)]
pub struct LdmRecord {
    /// Offset of the size field within the chunk.
    pub offset: usize,
    /// Declared payload length (absolute value of the size field).
    pub size: usize,
    /// Whether the size field carried the negative end-of-volume flag.
    pub end_of_volume_flag: bool,
    /// Whether the payload was bzip2-compressed.
    pub compressed: bool,
    /// Decompressed message stream.
    pub data: Bytes,
}

/// Iterator over the LDM records of a chunk.
///
/// Yields `Err` once and then stops if a record cannot be framed.
pub struct RecordFramer {
    data: Bytes,
    pos: usize,
    failed: bool,
}

impl RecordFramer {
    /// Start framing at `offset` (just past the volume header, or 0 for
    /// header-less chunks).
    pub fn new(data: Bytes, offset: usize) -> Self {
        Self {
            pos: offset.min(data.len()),
            data,
            failed: false,
        }
    }

    fn next_record(&mut self) -> Level2Result<LdmRecord> {
        let offset = self.pos;
        let size_bytes = self
            .data
            .get(offset..offset + 4)
            .ok_or(Level2Error::TruncatedRecord { offset })?;
        let raw_size = i32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]]);
        let size = raw_size.unsigned_abs() as usize;
        let end_of_volume_flag = raw_size < 0;

        let start = offset + 4;
        // Truncated chunks are common at file boundaries; take what is there.
        let end = start.saturating_add(size).min(self.data.len());
        let payload = self.data.slice(start..end);
        self.pos = end;

        let compressed = payload.starts_with(BZIP2_MAGIC);
        let data = if compressed {
            decompress(&payload, offset)?
        } else {
            payload
        };

        debug!(
            offset = offset,
            size = size,
            compressed = compressed,
            decoded_len = data.len(),
            end_of_volume = end_of_volume_flag,
            "Framed LDM record"
        );

        Ok(LdmRecord {
            offset,
            size,
            end_of_volume_flag,
            compressed,
            data,
        })
    }
}

impl Iterator for RecordFramer {
    type Item = Level2Result<LdmRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }

        let record = self.next_record();
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }
}

/// Decompress one bzip2 record payload into memory.
pub fn decompress(payload: &[u8], offset: usize) -> Level2Result<Bytes> {
    let mut decoder = bzip2::read::BzDecoder::new(payload);
    let mut out = Vec::with_capacity(payload.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Level2Error::Decompression {
            offset,
            reason: e.to_string(),
        })?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;

    fn record(size: i32, payload: &[u8]) -> Vec<u8> {
        let mut out = size.to_be_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_raw_record_bounded_by_size() {
        let mut data = record(3, &[1, 2, 3]);
        data.extend(record(2, &[9, 9]));

        let records: Vec<_> = RecordFramer::new(Bytes::from(data), 0)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(&records[0].data[..], &[1, 2, 3]);
        assert_eq!(&records[1].data[..], &[9, 9]);
        assert!(!records[0].compressed);
    }

    #[test]
    fn test_negative_size_is_advisory() {
        let mut data = record(-2, &[7, 7]);
        data.extend(record(1, &[8]));

        let records: Vec<_> = RecordFramer::new(Bytes::from(data), 0)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].end_of_volume_flag);
        assert_eq!(records[0].size, 2);
        assert!(!records[1].end_of_volume_flag);
    }

    #[test]
    fn test_compressed_record() {
        let message = vec![42u8; 500];
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&message).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.starts_with(b"BZ"));

        let data = record(compressed.len() as i32, &compressed);
        let records: Vec<_> = RecordFramer::new(Bytes::from(data), 0)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].compressed);
        assert_eq!(&records[0].data[..], &message[..]);
    }

    #[test]
    fn test_truncated_size_is_framing_error() {
        let mut data = record(1, &[1]);
        data.extend_from_slice(&[0, 0]);

        let results: Vec<_> = RecordFramer::new(Bytes::from(data), 0).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(matches!(err, Level2Error::TruncatedRecord { offset: 5 }));
        assert!(err.is_framing());
    }

    #[test]
    fn test_corrupt_bzip2_is_framing_error() {
        let data = record(8, b"BZh9garb");
        let mut framer = RecordFramer::new(Bytes::from(data), 0);
        let err = framer.next().unwrap().unwrap_err();
        assert!(matches!(err, Level2Error::Decompression { offset: 0, .. }));
        assert!(framer.next().is_none());
    }
}
