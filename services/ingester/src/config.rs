//! Ingester configuration.

use anyhow::{Context, Result};
use ingestion::{AccumulatorConfig, IngestionError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Top-level ingester configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngesterConfig {
    /// Chunk files or directories of chunk files
    pub inputs: Vec<PathBuf>,

    /// Directory completed scans are written to
    pub output_dir: PathBuf,

    /// Process one site at a time
    pub sequential: bool,

    /// Sites ingested concurrently when not sequential
    pub parallel_sites: usize,

    /// Pretty-print scan JSON
    pub pretty: bool,

    /// In-flight scan limits
    pub accumulator: AccumulatorConfig,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_dir: PathBuf::from("scans"),
            sequential: false,
            parallel_sites: 4,
            pretty: false,
            accumulator: AccumulatorConfig::default(),
        }
    }
}

impl IngesterConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let inputs = env::var("INGESTER_INPUTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or(defaults.inputs);

        Self {
            inputs,
            output_dir: env::var("INGESTER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            sequential: env::var("INGESTER_SEQUENTIAL")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.sequential),
            parallel_sites: env::var("INGESTER_PARALLEL_SITES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.parallel_sites),
            pretty: env::var("INGESTER_PRETTY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.pretty),
            accumulator: AccumulatorConfig::from_env(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            anyhow::bail!("no input files or directories configured");
        }
        if self.parallel_sites == 0 {
            anyhow::bail!("parallel_sites must be greater than 0");
        }
        self.accumulator
            .validate()
            .map_err(IngestionError::InvalidConfig)?;
        Ok(())
    }

    /// Number of sites ingested at once.
    ///
    /// Chunks of one site always run in name order.
    pub fn concurrency(&self) -> usize {
        if self.sequential {
            1
        } else {
            self.parallel_sites
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_defaults_fill_missing_fields() {
        let yaml = r#"
inputs:
  - /data/KTLX
output_dir: /tmp/scans
accumulator:
  max_in_flight: 128
"#;
        let config: IngesterConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.inputs, vec![PathBuf::from("/data/KTLX")]);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/scans"));
        assert!(!config.sequential);
        assert_eq!(config.parallel_sites, 4);
        assert_eq!(config.accumulator.max_in_flight, 128);
        assert_eq!(config.accumulator.stale_after_secs, 1800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_inputs() {
        let config = IngesterConfig::default();
        assert!(config.validate().is_err());

        let config = IngesterConfig {
            inputs: vec![PathBuf::from("chunks")],
            parallel_sites: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = IngesterConfig {
            inputs: vec![PathBuf::from("chunks")],
            accumulator: AccumulatorConfig {
                max_in_flight: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestionError>(),
            Some(IngestionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sequential_forces_single_worker() {
        let config = IngesterConfig {
            sequential: true,
            parallel_sites: 8,
            ..Default::default()
        };
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = test_utils::temp_test_dir();
        let path = dir.path().join("ingester.yaml");
        std::fs::write(&path, "inputs: [a, b]\nsequential: true\n").unwrap();

        let config = IngesterConfig::from_yaml(&path).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert!(config.sequential);

        assert!(IngesterConfig::from_yaml(dir.path().join("missing.yaml")).is_err());
    }
}
