//! Cross-chunk scan accumulation and completion.
//!
//! The accumulator owns the registry of in-flight scans keyed by
//! (site, product, elevation). Each processed chunk merges its fragments in
//! one call. A scan is finalized when it has seen end-of-elevation or
//! end-of-volume and the volume's coverage pattern is known; it is then
//! removed under the lock and handed to the sink after the lock is released,
//! so it can be emitted only once.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::assembler::{Scan, ScanKey};
use crate::config::AccumulatorConfig;
use crate::sink::ScanSink;

/// What one `merge` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Fragments that started a new in-flight scan.
    pub inserted: usize,
    /// Fragments appended to an existing scan.
    pub appended: usize,
    /// Scans finalized and handed to the sink.
    pub emitted: usize,
    /// Flagged scans held back because the VCP is unknown.
    pub deferred: usize,
    /// Scans discarded to respect `max_in_flight`.
    pub evicted: usize,
}

struct InFlight {
    scan: Scan,
    last_update: Instant,
}

/// Registry of in-flight scans.
pub struct VolumeAccumulator {
    config: AccumulatorConfig,
    in_flight: Mutex<HashMap<ScanKey, InFlight>>,
    sink: Arc<dyn ScanSink>,
}

impl VolumeAccumulator {
    pub fn new(config: AccumulatorConfig, sink: Arc<dyn ScanSink>) -> Self {
        Self {
            config,
            in_flight: Mutex::new(HashMap::new()),
            sink,
        }
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ScanKey, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge the fragments of one chunk.
    ///
    /// `vcp` is the governing pattern number, 0 when not yet known. Rows are
    /// appended in call order.
    pub fn merge(&self, site: &str, vcp: u16, fragments: Vec<Scan>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut ready = Vec::new();

        {
            let mut registry = self.registry();
            let now = Instant::now();

            for fragment in fragments {
                let key = ScanKey::new(site, fragment.product, fragment.elevation_number);

                let entry = match registry.entry(key.clone()) {
                    Entry::Occupied(occupied) => {
                        let entry = occupied.into_mut();
                        entry.scan.append(fragment);
                        entry.last_update = now;
                        outcome.appended += 1;
                        entry
                    }
                    Entry::Vacant(vacant) => {
                        outcome.inserted += 1;
                        vacant.insert(InFlight {
                            scan: fragment,
                            last_update: now,
                        })
                    }
                };

                if !entry.scan.is_flagged_complete() {
                    continue;
                }

                if vcp == 0 {
                    outcome.deferred += 1;
                    debug!(scan = %key, rows = entry.scan.rows(), "Scan complete but VCP unknown, deferring");
                } else if let Some(done) = registry.remove(&key) {
                    outcome.emitted += 1;
                    ready.push(done.scan);
                }
            }

            outcome.evicted = self.enforce_capacity(&mut registry);
        }

        self.emit_all(ready, vcp);
        outcome
    }

    /// Finalize flagged scans of `site` held back while its VCP was unknown.
    ///
    /// Returns the number of scans emitted.
    pub fn release_deferred(&self, site: &str, vcp: u16) -> usize {
        if vcp == 0 {
            return 0;
        }

        let ready: Vec<Scan> = {
            let mut registry = self.registry();
            let keys: Vec<ScanKey> = registry
                .iter()
                .filter(|(key, entry)| key.site == site && entry.scan.is_flagged_complete())
                .map(|(key, _)| key.clone())
                .collect();
            let mut ready: Vec<Scan> = keys
                .iter()
                .filter_map(|key| registry.remove(key))
                .map(|entry| entry.scan)
                .collect();
            ready.sort_by(|a, b| a.key().cmp(&b.key()));
            ready
        };

        let released = ready.len();
        if released > 0 {
            info!(site = %site, vcp = vcp, released = released, "Releasing deferred scans");
        }
        self.emit_all(ready, vcp);
        released
    }

    /// Drop scans not updated within `stale_after_secs` of `now`.
    ///
    /// Evicted scans are discarded, never emitted.
    pub fn evict_stale(&self, now: Instant) -> Vec<ScanKey> {
        let stale_after = self.config.stale_after();
        let mut registry = self.registry();

        let stale: Vec<ScanKey> = registry
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_update) >= stale_after)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            if let Some(entry) = registry.remove(key) {
                warn!(
                    scan = %key,
                    rows = entry.scan.rows(),
                    flagged = entry.scan.is_flagged_complete(),
                    "Evicting stale in-flight scan"
                );
            }
        }
        stale
    }

    pub fn in_flight_len(&self) -> usize {
        self.registry().len()
    }

    pub fn contains(&self, key: &ScanKey) -> bool {
        self.registry().contains_key(key)
    }

    /// Copy of an in-flight scan.
    pub fn snapshot(&self, key: &ScanKey) -> Option<Scan> {
        self.registry().get(key).map(|entry| entry.scan.clone())
    }

    fn enforce_capacity(&self, registry: &mut HashMap<ScanKey, InFlight>) -> usize {
        let excess = registry.len().saturating_sub(self.config.max_in_flight);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(Instant, ScanKey)> = registry
            .iter()
            .map(|(key, entry)| (entry.last_update, key.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(excess) {
            registry.remove(&key);
            warn!(scan = %key, max_in_flight = self.config.max_in_flight, "In-flight limit reached, evicting oldest scan");
        }
        excess
    }

    fn emit_all(&self, scans: Vec<Scan>, vcp: u16) {
        for scan in scans {
            info!(
                site = %scan.icao,
                product = %scan.product,
                elevation = scan.elevation_number,
                elevation_angle = scan.elevation_angle,
                rows = scan.rows(),
                eov = scan.eov,
                vcp = vcp,
                "Scan completed"
            );
            self.sink.emit(scan);
        }
    }
}
