//! Chunk metadata from real-time object names and notification payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{IngestionError, Result};

/// Position of a chunk within its volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    /// `S`: first chunk, carries the volume header and usually the VCP.
    Start,
    /// `I`
    Intermediate,
    /// `E`: last chunk of the volume.
    End,
}

impl ChunkType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(ChunkType::Start),
            "I" => Some(ChunkType::Intermediate),
            "E" => Some(ChunkType::End),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ChunkType::Start => "S",
            ChunkType::Intermediate => "I",
            ChunkType::End => "E",
        }
    }
}

/// What is known about a chunk before its bytes are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFileData {
    /// Site from the notification; object names do not carry it.
    pub site: Option<String>,
    /// Volume start time shared by every chunk of the volume.
    pub init_time: DateTime<Utc>,
    pub number: u32,
    pub chunk_type: ChunkType,
}

impl ChunkFileData {
    /// Parse a real-time object name of the form `YYYYMMDD-HHMMSS-NNN-T`.
    ///
    /// Leading path components (e.g. `KTLX/42/`) are ignored.
    pub fn from_filename(name: &str) -> Result<Self> {
        let invalid = || IngestionError::InvalidChunkName(name.to_string());

        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(invalid)?;

        let segments: Vec<&str> = file_name.split('-').collect();
        if segments.len() != 4 {
            return Err(invalid());
        }

        let init_time =
            NaiveDateTime::parse_from_str(&format!("{}{}", segments[0], segments[1]), "%Y%m%d%H%M%S")
                .map_err(|_| invalid())?
                .and_utc();
        let number = segments[2].parse().map_err(|_| invalid())?;
        let chunk_type = ChunkType::from_code(segments[3]).ok_or_else(invalid)?;

        Ok(Self {
            site: None,
            init_time,
            number,
            chunk_type,
        })
    }

    /// Build from a chunk notification payload.
    pub fn from_payload(payload: &ChunkPayload) -> Result<Self> {
        let init_time = NaiveDateTime::parse_from_str(&payload.date_time, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| {
                IngestionError::InvalidChunkName(format!(
                    "{}: bad DateTime {:?}: {}",
                    payload.key, payload.date_time, e
                ))
            })?
            .and_utc();
        let chunk_type = ChunkType::from_code(&payload.chunk_type).ok_or_else(|| {
            IngestionError::InvalidChunkName(format!(
                "{}: bad ChunkType {:?}",
                payload.key, payload.chunk_type
            ))
        })?;

        Ok(Self {
            site: Some(payload.site_id.clone()),
            init_time,
            number: payload.chunk_id,
            chunk_type,
        })
    }

    pub fn is_start(&self) -> bool {
        self.chunk_type == ChunkType::Start
    }

    pub fn is_end(&self) -> bool {
        self.chunk_type == ChunkType::End
    }
}

impl fmt::Display for ChunkFileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:03}-{}",
            self.init_time.format("%Y%m%d-%H%M%S"),
            self.number,
            self.chunk_type.code()
        )
    }
}

/// Notification published when a chunk lands in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "SiteID")]
    pub site_id: String,
    /// `YYYY-MM-DDTHH:MM:SS`
    #[serde(rename = "DateTime")]
    pub date_time: String,
    #[serde(rename = "VolumeID")]
    pub volume_id: u32,
    #[serde(rename = "ChunkID")]
    pub chunk_id: u32,
    #[serde(rename = "ChunkType")]
    pub chunk_type: String,
    #[serde(rename = "L2Version")]
    pub l2_version: String,
}

/// Volume identifier: `YYYYMMDDHHMMSS` followed by the site ICAO.
pub fn volume_id(init_time: DateTime<Utc>, icao: &str) -> String {
    format!("{}{}", init_time.format("%Y%m%d%H%M%S"), icao)
}
