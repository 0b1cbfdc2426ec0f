//! Main Ingester: chunk bytes in, completed scans out.

use anyhow::anyhow;
use bytes::Bytes;
use level2_parser::{decode_chunk, Level2Chunk};
use std::sync::Arc;
use tracing::{info, warn};

use crate::accumulator::{MergeOutcome, VolumeAccumulator};
use crate::assembler::assemble;
use crate::config::AccumulatorConfig;
use crate::error::{IngestionError, Result};
use crate::metadata::{volume_id, ChunkFileData, ChunkType};
use crate::sink::ScanSink;
use crate::volume::VolumeRegistry;

/// Result of ingesting one chunk.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub site: String,
    pub volume_id: String,
    /// VCP the chunk's scans were merged under (0 if unknown).
    pub vcp: u16,
    pub radials: usize,
    pub failed_radials: usize,
    /// Scan fragments assembled from the chunk.
    pub fragments: usize,
    pub merge: MergeOutcome,
    /// Deferred scans released once the site's VCP became known.
    pub released: usize,
}

impl IngestionResult {
    /// Scans handed to the sink while processing this chunk.
    pub fn scans_emitted(&self) -> usize {
        self.merge.emitted + self.released
    }
}

/// Core ingester for Level II chunks.
///
/// Safe to share across threads; chunks may be ingested concurrently.
pub struct Ingester {
    volumes: VolumeRegistry,
    accumulator: VolumeAccumulator,
}

impl Ingester {
    pub fn new(config: AccumulatorConfig, sink: Arc<dyn ScanSink>) -> Self {
        Self {
            volumes: VolumeRegistry::new(),
            accumulator: VolumeAccumulator::new(config, sink),
        }
    }

    pub fn volumes(&self) -> &VolumeRegistry {
        &self.volumes
    }

    pub fn accumulator(&self) -> &VolumeAccumulator {
        &self.accumulator
    }

    /// Ingest one real-time chunk.
    ///
    /// Decoding finishes before any shared state changes, so a framing or
    /// identity error leaves the registries untouched.
    pub fn ingest_chunk(&self, data: Bytes, chunk: &ChunkFileData) -> Result<IngestionResult> {
        let decoded = decode_chunk(data)?;
        self.ingest_decoded(decoded, chunk)
    }

    /// Ingest a complete archive file as a single start-and-end chunk.
    pub fn ingest_archive(&self, data: Bytes) -> Result<IngestionResult> {
        let decoded = decode_chunk(data)?;
        let header = decoded
            .volume_header
            .as_ref()
            .ok_or_else(|| IngestionError::Other(anyhow!("archive file has no volume header")))?;

        let chunk = ChunkFileData {
            site: None,
            init_time: header.date_time(),
            number: 1,
            chunk_type: ChunkType::Start,
        };
        let result = self.ingest_decoded(decoded, &chunk)?;
        self.volumes.close_volume(&result.volume_id);
        Ok(result)
    }

    fn ingest_decoded(&self, decoded: Level2Chunk, chunk: &ChunkFileData) -> Result<IngestionResult> {
        let site = decoded.icao().ok_or(IngestionError::MissingIcao)?;
        if let Some(expected) = chunk.site.as_deref() {
            if expected != site {
                warn!(chunk = %chunk, expected = %expected, site = %site, "Chunk site differs from notification");
            }
        }

        let vid = volume_id(chunk.init_time, &site);

        let vcp = if chunk.is_start() {
            self.volumes
                .open_volume(&site, chunk.init_time, decoded.vcp_number())
                .vcp
        } else {
            let volume = self
                .volumes
                .get(&vid)
                .ok_or_else(|| IngestionError::VolumeNotFound {
                    volume_id: vid.clone(),
                    chunk: chunk.to_string(),
                })?;

            match decoded.vcp_number() {
                Some(vcp) if self.volumes.bind_vcp(&vid, vcp) => vcp,
                _ if volume.vcp != 0 => volume.vcp,
                _ => self.volumes.site_vcp(&site).unwrap_or(0),
            }
        };

        // Scans held back for this site go out before this chunk's rows can
        // be appended to them.
        let mut released = self.accumulator.release_deferred(&site, vcp);

        let scans = assemble(&decoded.radials, &site, chunk.init_time);
        if let Some(last) = scans.iter().max_by_key(|s| s.elevation_number) {
            self.volumes
                .record_progress(&vid, last.elevation_number, last.elevation_angle);
        }

        let fragments = scans.len();
        let merge = self.accumulator.merge(&site, vcp, scans);
        if merge.deferred > 0 {
            released += self.release_if_bound(&site, &vid);
        }

        if chunk.is_end() {
            self.volumes.close_volume(&vid);
        }

        info!(
            site = %site,
            volume = %vid,
            chunk = %chunk,
            vcp = vcp,
            radials = decoded.radials.len(),
            failed_radials = decoded.stats.failed_radials,
            fragments = fragments,
            emitted = merge.emitted + released,
            deferred = merge.deferred,
            "Ingested chunk"
        );

        Ok(IngestionResult {
            site,
            volume_id: vid,
            vcp,
            radials: decoded.radials.len(),
            failed_radials: decoded.stats.failed_radials,
            fragments,
            merge,
            released,
        })
    }

    /// Release deferred scans when a VCP was bound while this chunk merged.
    fn release_if_bound(&self, site: &str, volume_id: &str) -> usize {
        let vcp = self
            .volumes
            .get(volume_id)
            .map(|v| v.vcp)
            .filter(|vcp| *vcp != 0)
            .or_else(|| self.volumes.site_vcp(site))
            .unwrap_or(0);
        self.accumulator.release_deferred(site, vcp)
    }
}
