//! Configuration for the scan accumulator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits on in-flight scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// In-flight scans untouched for this many seconds may be evicted.
    pub stale_after_secs: u64,

    /// Soft cap on in-flight scans; the oldest are evicted past it.
    pub max_in_flight: usize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 1800,
            max_in_flight: 4096,
        }
    }
}

impl AccumulatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ACCUMULATOR_STALE_AFTER_SECS") {
            if let Ok(secs) = val.parse() {
                config.stale_after_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("ACCUMULATOR_MAX_IN_FLIGHT") {
            if let Ok(max) = val.parse() {
                config.max_in_flight = max;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.stale_after_secs == 0 {
            return Err("stale_after_secs must be > 0".to_string());
        }

        if self.max_in_flight == 0 {
            return Err("max_in_flight must be > 0".to_string());
        }

        Ok(())
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AccumulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stale_after(), Duration::from_secs(1800));
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let config = AccumulatorConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AccumulatorConfig {
            stale_after_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AccumulatorConfig = serde_yaml::from_str("max_in_flight: 10").unwrap();
        assert_eq!(config.max_in_flight, 10);
        assert_eq!(config.stale_after_secs, 1800);
    }
}
