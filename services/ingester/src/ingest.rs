//! Ingestion pipeline for Level II chunk files on disk.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use ingestion::{ChunkFileData, Ingester, IngestionError, IngestionResult, Scan};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::IngesterConfig;

/// Totals for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub files: usize,
    pub ingested: usize,
    pub failed: usize,
    pub scans_written: usize,
    /// Scans still waiting for an end-of-elevation flag when the run ended.
    pub incomplete: usize,
}

/// Writes completed scans as JSON under `<output>/<volume>/`.
#[derive(Debug, Clone)]
pub struct ScanWriter {
    output_dir: PathBuf,
    pretty: bool,
}

impl ScanWriter {
    pub fn new(output_dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            pretty,
        }
    }

    /// `<output>/<volume>/<site>_<product>_<elevation>.json`
    pub fn scan_path(&self, scan: &Scan) -> PathBuf {
        self.output_dir
            .join(ingestion::volume_id(scan.init_time, &scan.icao))
            .join(format!(
                "{}_{}_{}.json",
                scan.icao, scan.product, scan.elevation_number
            ))
    }

    pub async fn write(&self, scan: &Scan) -> Result<PathBuf> {
        let path = self.scan_path(scan);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let json = if self.pretty {
            serde_json::to_vec_pretty(scan)?
        } else {
            serde_json::to_vec(scan)?
        };
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Expand inputs into chunk files ordered by file name.
///
/// Real-time chunk names sort chronologically, so name order is arrival order.
pub fn discover_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path()),
            );
        } else {
            files.push(input.clone());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    files.dedup();
    files
}

/// Site a file belongs to.
///
/// Chunk files sit under `<site>/` or `<site>/<volume number>/`. Archive
/// names start with the four-letter site identifier; anything else is its
/// own group.
fn site_of(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if ChunkFileData::from_filename(name).is_err() {
        return match name.get(..4) {
            Some(icao) if icao.bytes().all(|b| b.is_ascii_uppercase()) => icao.to_string(),
            _ => path.display().to_string(),
        };
    }

    let mut dirs = path
        .ancestors()
        .skip(1)
        .filter_map(|dir| dir.file_name())
        .filter_map(|name| name.to_str());
    match dirs.next() {
        Some(dir) if dir.bytes().all(|b| b.is_ascii_digit()) => {
            dirs.next().unwrap_or(dir).to_string()
        }
        Some(dir) => dir.to_string(),
        None => String::new(),
    }
}

/// Split name-ordered files into per-site runs, keeping name order.
///
/// A site's chunks share volume and scan state, so they are ingested one
/// after another; different sites can run side by side.
fn group_by_site(files: Vec<PathBuf>) -> Vec<(String, Vec<PathBuf>)> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        groups.entry(site_of(&path)).or_default().push(path);
    }
    groups.into_iter().collect()
}

/// Drives chunk files through a shared [`Ingester`].
pub struct IngestionPipeline {
    config: IngesterConfig,
}

impl IngestionPipeline {
    pub fn new(config: IngesterConfig) -> Self {
        Self { config }
    }

    /// Ingest every input file and write the scans they complete.
    pub async fn run(&self) -> Result<PipelineSummary> {
        let files = discover_inputs(&self.config.inputs);
        info!(
            files = files.len(),
            sequential = self.config.sequential,
            output = %self.config.output_dir.display(),
            "Starting ingestion run"
        );

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.config.output_dir.display()))?;

        let (tx, rx) = unbounded_channel::<Scan>();
        let ingester = Arc::new(Ingester::new(self.config.accumulator.clone(), Arc::new(tx)));
        let writer = ScanWriter::new(&self.config.output_dir, self.config.pretty);
        let writer_task = tokio::spawn(write_scans(rx, writer));

        let mut summary = PipelineSummary {
            files: files.len(),
            ..Default::default()
        };

        let groups = group_by_site(files);
        debug!(sites = groups.len(), "Grouped input files by site");

        let mut results = stream::iter(groups)
            .map(|(site, paths)| {
                let ingester = ingester.clone();
                async move {
                    let mut results = Vec::with_capacity(paths.len());
                    for path in paths {
                        let result = ingest_file(ingester.clone(), &path).await;
                        results.push((path, result));
                    }
                    debug!(site = %site, files = results.len(), "Finished site");
                    results
                }
            })
            .buffer_unordered(self.config.concurrency())
            .flat_map(stream::iter);

        while let Some((path, result)) = results.next().await {
            match result {
                Ok(_) => summary.ingested += 1,
                Err(e) => {
                    summary.failed += 1;
                    if e.is_framing() || e.is_identity() {
                        warn!(file = %path.display(), error = %e, "Skipping undecodable chunk");
                    } else {
                        error!(file = %path.display(), error = %e, "Chunk ingestion failed");
                    }
                }
            }
        }
        drop(results);

        summary.incomplete = ingester.accumulator().in_flight_len();
        if summary.incomplete > 0 {
            warn!(
                in_flight = summary.incomplete,
                "Run ended with scans still waiting for completion"
            );
        }

        // The channel closes once the last ingester handle is gone.
        drop(ingester);
        summary.scans_written = writer_task.await.context("Scan writer task panicked")?;

        info!(
            files = summary.files,
            ingested = summary.ingested,
            failed = summary.failed,
            scans = summary.scans_written,
            "Ingestion run completed"
        );
        Ok(summary)
    }
}

/// Read and ingest one file on the blocking pool.
///
/// Files named like real-time chunks go through `ingest_chunk`; anything else
/// is treated as a complete archive.
#[instrument(skip(ingester), fields(file = %path.display()))]
pub async fn ingest_file(
    ingester: Arc<Ingester>,
    path: &Path,
) -> ingestion::Result<IngestionResult> {
    let data = bytes::Bytes::from(tokio::fs::read(path).await?);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let task = match ChunkFileData::from_filename(&name) {
        Ok(chunk) => {
            debug!(chunk = %chunk, bytes = data.len(), "Ingesting chunk");
            tokio::task::spawn_blocking(move || ingester.ingest_chunk(data, &chunk))
        }
        Err(_) => {
            debug!(bytes = data.len(), "Ingesting archive file");
            tokio::task::spawn_blocking(move || ingester.ingest_archive(data))
        }
    };

    task.await
        .map_err(|e| IngestionError::Other(anyhow::Error::new(e)))?
}

async fn write_scans(mut rx: UnboundedReceiver<Scan>, writer: ScanWriter) -> usize {
    let mut written = 0;
    while let Some(scan) = rx.recv().await {
        match writer.write(&scan).await {
            Ok(path) => {
                debug!(path = %path.display(), rows = scan.rows(), "Wrote scan");
                written += 1;
            }
            Err(e) => error!(scan = %scan.key(), error = %e, "Failed to write scan"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use level2_parser::Product;

    fn scan(product: Product) -> Scan {
        Scan {
            icao: "KTLX".to_string(),
            product,
            elevation_angle: 0.5,
            elevation_number: 3,
            start_azimuth: 0.0,
            start_azimuth_number: 1,
            azimuth_resolution: 0.5,
            start_range: 2.125,
            gate_interval: 0.25,
            lat: 35.333,
            lon: -97.278,
            gates: vec![vec![1.0]],
            init_time: Utc.with_ymd_and_hms(2024, 4, 1, 21, 46, 57).unwrap(),
            eoe: true,
            eov: false,
        }
    }

    #[test]
    fn test_scan_path_layout() {
        let writer = ScanWriter::new("/out", false);

        assert_eq!(
            writer.scan_path(&scan(Product::Reflectivity)),
            PathBuf::from("/out/20240401214657KTLX/KTLX_REF_3.json")
        );
        assert_eq!(
            writer.scan_path(&scan(Product::SpectrumWidth)),
            PathBuf::from("/out/20240401214657KTLX/KTLX_SW_3.json")
        );
    }

    #[test]
    fn test_discover_inputs_orders_by_name() {
        let dir = test_utils::temp_test_dir();
        let nested = dir.path().join("KTLX").join("7");
        std::fs::create_dir_all(&nested).unwrap();
        for name in ["20240401-214657-003-E", "20240401-214657-001-S"] {
            std::fs::write(nested.join(name), b"").unwrap();
        }
        std::fs::write(dir.path().join("20240401-214657-002-I"), b"").unwrap();

        let files = discover_inputs(&[dir.path().to_path_buf()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "20240401-214657-001-S",
                "20240401-214657-002-I",
                "20240401-214657-003-E"
            ]
        );
    }

    #[test]
    fn test_site_of_chunks_and_archives() {
        assert_eq!(
            site_of(Path::new("/data/KTLX/7/20240401-214657-001-S")),
            "KTLX"
        );
        assert_eq!(site_of(Path::new("/data/KFWS/20240401-214657-002-I")), "KFWS");
        assert_eq!(site_of(Path::new("/data/KTLX20240401_214657_V06")), "KTLX");
        assert_eq!(site_of(Path::new("/data/notes.txt")), "/data/notes.txt");
    }

    #[test]
    fn test_group_by_site_keeps_name_order() {
        assert!(group_by_site(Vec::new()).is_empty());

        let files = vec![
            PathBuf::from("/data/KTLX/7/20240401-214657-001-S"),
            PathBuf::from("/data/KFWS/3/20240401-214700-001-S"),
            PathBuf::from("/data/KTLX/7/20240401-214657-002-I"),
            PathBuf::from("/data/KFWS/3/20240401-214700-002-E"),
            PathBuf::from("/data/KTLX/7/20240401-214657-003-E"),
        ];
        let groups = group_by_site(files);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "KFWS");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "KTLX");
        let names: Vec<_> = groups[1]
            .1
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "20240401-214657-001-S",
                "20240401-214657-002-I",
                "20240401-214657-003-E"
            ]
        );
    }

    #[tokio::test]
    async fn test_writer_creates_volume_directory() {
        let dir = test_utils::temp_test_dir_with_prefix("scans");
        let writer = ScanWriter::new(dir.path(), true);

        let path = writer.write(&scan(Product::Velocity)).await.unwrap();
        assert!(path.ends_with("20240401214657KTLX/KTLX_VEL_3.json"));

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["productType"], "VEL");
        assert_eq!(json["elevationNumber"], 3);
    }
}
