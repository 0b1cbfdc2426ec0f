//! Open volumes and the last coverage pattern seen per site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::metadata::volume_id;

/// One volume scan of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub site: String,
    pub init_time: DateTime<Utc>,
    /// Coverage pattern number; 0 until known.
    pub vcp: u16,
    #[serde(rename = "current_elevation_number")]
    pub current_elevation: u8,
    pub current_elevation_angle: f32,
}

#[derive(Default)]
struct RegistryState {
    volumes: HashMap<String, Volume>,
    site_vcp: HashMap<String, u16>,
}

/// In-memory registry of open volumes.
#[derive(Default)]
pub struct VolumeRegistry {
    state: Mutex<RegistryState>,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open (or reopen) the volume started by a start chunk.
    ///
    /// The VCP comes from the chunk when it carried one, else from the last
    /// pattern seen for the site, else stays 0.
    pub fn open_volume(&self, site: &str, init_time: DateTime<Utc>, vcp: Option<u16>) -> Volume {
        let mut state = self.state();

        let vcp = match vcp.filter(|v| *v != 0) {
            Some(vcp) => {
                state.site_vcp.insert(site.to_string(), vcp);
                vcp
            }
            None => state.site_vcp.get(site).copied().unwrap_or(0),
        };

        let volume = Volume {
            id: volume_id(init_time, site),
            site: site.to_string(),
            init_time,
            vcp,
            current_elevation: 0,
            current_elevation_angle: 0.0,
        };
        debug!(volume = %volume.id, vcp = vcp, "Opened volume");
        state.volumes.insert(volume.id.clone(), volume.clone());
        volume
    }

    pub fn get(&self, volume_id: &str) -> Option<Volume> {
        self.state().volumes.get(volume_id).cloned()
    }

    /// Late-bind a VCP to an open volume.
    ///
    /// Returns true when the volume's VCP went from unknown to known.
    pub fn bind_vcp(&self, volume_id: &str, vcp: u16) -> bool {
        if vcp == 0 {
            return false;
        }

        let mut state = self.state();
        let Some(volume) = state.volumes.get_mut(volume_id) else {
            return false;
        };
        if volume.vcp != 0 {
            return false;
        }

        volume.vcp = vcp;
        let site = volume.site.clone();
        state.site_vcp.insert(site, vcp);
        debug!(volume = %volume_id, vcp = vcp, "Bound VCP to volume");
        true
    }

    /// Remember the highest elevation seen so far.
    pub fn record_progress(&self, volume_id: &str, elevation: u8, angle: f32) {
        if let Some(volume) = self.state().volumes.get_mut(volume_id) {
            if elevation >= volume.current_elevation {
                volume.current_elevation = elevation;
                volume.current_elevation_angle = angle;
            }
        }
    }

    pub fn close_volume(&self, volume_id: &str) -> Option<Volume> {
        let closed = self.state().volumes.remove(volume_id);
        if closed.is_some() {
            debug!(volume = %volume_id, "Closed volume");
        }
        closed
    }

    /// Last known VCP of a site.
    pub fn site_vcp(&self, site: &str) -> Option<u16> {
        self.state().site_vcp.get(site).copied()
    }

    pub fn len(&self) -> usize {
        self.state().volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn init_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 21, 46, 57).unwrap()
    }

    #[test]
    fn test_open_volume_falls_back_to_site_vcp() {
        let registry = VolumeRegistry::new();

        let first = registry.open_volume("KTLX", init_time(), None);
        assert_eq!(first.id, "20240401214657KTLX");
        assert_eq!(first.vcp, 0);

        registry.open_volume("KTLX", init_time(), Some(212));
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 21, 52, 10).unwrap();
        let second = registry.open_volume("KTLX", later, None);
        assert_eq!(second.vcp, 212);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_bind_vcp_only_once() {
        let registry = VolumeRegistry::new();
        let volume = registry.open_volume("KTLX", init_time(), None);

        assert!(!registry.bind_vcp(&volume.id, 0));
        assert!(registry.bind_vcp(&volume.id, 35));
        assert!(!registry.bind_vcp(&volume.id, 212));
        assert_eq!(registry.get(&volume.id).unwrap().vcp, 35);
        assert_eq!(registry.site_vcp("KTLX"), Some(35));
        assert!(!registry.bind_vcp("missing", 35));
    }

    #[test]
    fn test_progress_and_close() {
        let registry = VolumeRegistry::new();
        let volume = registry.open_volume("KTLX", init_time(), Some(212));

        registry.record_progress(&volume.id, 3, 1.8);
        registry.record_progress(&volume.id, 2, 1.3);
        let current = registry.get(&volume.id).unwrap();
        assert_eq!(current.current_elevation, 3);
        assert_eq!(current.current_elevation_angle, 1.8);

        assert!(registry.close_volume(&volume.id).is_some());
        assert!(registry.get(&volume.id).is_none());
        assert!(registry.is_empty());
    }
}
