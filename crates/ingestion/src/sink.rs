//! Destinations for completed scans.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::assembler::Scan;

/// Receives each completed scan exactly once.
///
/// `emit` is called outside the accumulator lock and must not block for long.
pub trait ScanSink: Send + Sync {
    fn emit(&self, scan: Scan);
}

impl ScanSink for UnboundedSender<Scan> {
    fn emit(&self, scan: Scan) {
        if let Err(e) = self.send(scan) {
            let scan = e.0;
            warn!(
                site = %scan.icao,
                product = %scan.product,
                elevation = scan.elevation_number,
                "Scan receiver closed, dropping scan"
            );
        }
    }
}

impl<S: ScanSink + ?Sized> ScanSink for Arc<S> {
    fn emit(&self, scan: Scan) {
        (**self).emit(scan)
    }
}

/// Keeps every emitted scan in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    scans: Mutex<Vec<Scan>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the scans emitted so far, in emission order.
    pub fn scans(&self) -> Vec<Scan> {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return the scans emitted so far.
    pub fn take(&self) -> Vec<Scan> {
        std::mem::take(&mut *self.scans.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.scans.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScanSink for CollectingSink {
    fn emit(&self, scan: Scan) {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(scan);
    }
}
