//! Level II radar ingester service.
//!
//! Reads real-time chunk files (or whole archive files) from disk, feeds them
//! through [`ingestion::Ingester`] and writes every completed scan as JSON.

pub mod config;
pub mod ingest;

pub use config::IngesterConfig;
pub use ingest::{discover_inputs, ingest_file, IngestionPipeline, PipelineSummary, ScanWriter};
