//! Error types for Level II decoding.

use thiserror::Error;

/// Result type for Level II decoding operations.
pub type Level2Result<T> = Result<T, Level2Error>;

/// Errors raised while decoding a Level II chunk.
///
/// Framing errors abort the whole chunk. Radial errors abort only the
/// radial being decoded; the reader logs them and moves on to the next
/// message frame.
#[derive(Error, Debug)]
pub enum Level2Error {
    /// Fewer than 24 bytes were available for the volume header.
    #[error("truncated volume header: need 24 bytes, got {0}")]
    TruncatedVolumeHeader(usize),

    /// The LDM record size field was cut short.
    #[error("truncated LDM record size at offset {offset}")]
    TruncatedRecord { offset: usize },

    /// The bzip2 stream of an LDM record could not be decompressed.
    #[error("bzip2 decompression failed for record at offset {offset}: {reason}")]
    Decompression { offset: usize, reason: String },

    /// A fixed-size structure ran past the end of the available bytes.
    #[error("short read decoding {context} at offset {offset}: need {needed} bytes, {available} available")]
    ShortRead {
        context: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A moment block declared a gate word size this decoder cannot unpack.
    #[error("unsupported data word size {word_size} in {tag} moment")]
    UnsupportedWordSize { tag: String, word_size: u8 },
}

impl Level2Error {
    /// Whether this error invalidates the whole chunk rather than a single radial.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Level2Error::TruncatedVolumeHeader(_)
                | Level2Error::TruncatedRecord { .. }
                | Level2Error::Decompression { .. }
        )
    }
}
