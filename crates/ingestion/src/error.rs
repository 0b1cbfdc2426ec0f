//! Error types for the ingestion crate.

use level2_parser::Level2Error;
use thiserror::Error;

/// Errors that can occur while ingesting a chunk.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to decode Level II data: {0}")]
    Decode(#[from] Level2Error),

    /// The chunk names no site, so its scans cannot be attributed.
    #[error("Chunk has no site ICAO in its volume header or radials")]
    MissingIcao,

    #[error("No open volume {volume_id} for non-start chunk {chunk}")]
    VolumeNotFound { volume_id: String, chunk: String },

    #[error("Invalid chunk name: {0}")]
    InvalidChunkName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl IngestionError {
    /// The chunk could not be attributed to a site.
    pub fn is_identity(&self) -> bool {
        matches!(self, IngestionError::MissingIcao)
    }

    /// Record framing failed; the chunk bytes are corrupt or truncated.
    pub fn is_framing(&self) -> bool {
        matches!(self, IngestionError::Decode(e) if e.is_framing())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
