//! Level II radar ingestion library.
//!
//! Turns the chunks of a real-time Level II feed into completed scans: one
//! product on one elevation, with a row of physical gate values per radial.
//!
//! # Architecture
//!
//! - [`level2_parser`] decodes a chunk into radials and an optional VCP
//! - [`assemble`] groups one chunk's radials into scan fragments
//! - [`VolumeAccumulator`] merges fragments across chunks and finalizes scans
//! - [`VolumeRegistry`] tracks open volumes and the last VCP seen per site
//! - [`Ingester`] ties the above together behind a thread-safe API
//!
//! Completed scans are handed to a [`ScanSink`], for example an
//! unbounded tokio channel.

pub mod accumulator;
pub mod assembler;
pub mod config;
pub mod error;
pub mod metadata;
pub mod sink;
pub mod volume;
mod ingester;

// Re-exports
pub use accumulator::{MergeOutcome, VolumeAccumulator};
pub use assembler::{assemble, Scan, ScanKey};
pub use config::AccumulatorConfig;
pub use error::{IngestionError, Result};
pub use ingester::{Ingester, IngestionResult};
pub use metadata::{volume_id, ChunkFileData, ChunkPayload, ChunkType};
pub use sink::{CollectingSink, ScanSink};
pub use volume::{Volume, VolumeRegistry};
