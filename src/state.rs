//! Global application state shared between the collector and the HTTP layer

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::MeterConfig;

/// The latest completed measurement.
///
/// Immutable once constructed; the cache holds at most one instance and
/// swaps it wholesale on each successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeMeasurement {
    pub current_size_bytes: u64,
    pub max_size_bytes: u64,
    pub used_percentage: f64,
}

impl SizeMeasurement {
    pub fn new(current_size_bytes: u64, max_size_bytes: u64) -> Self {
        let used_percentage = current_size_bytes as f64 / max_size_bytes as f64 * 100.0;
        SizeMeasurement {
            current_size_bytes,
            max_size_bytes,
            used_percentage,
        }
    }
}

/// Handle to the result cache. Written only by the collector, read by the
/// HTTP handlers; readers always observe a complete snapshot.
pub type MeasurementCache = Arc<RwLock<Option<SizeMeasurement>>>;

/// Application state shared across all handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MeterConfig>,

    /// Most recent successful measurement, if any
    pub cache: MeasurementCache,

    /// Set while a measurement run is in flight; the trigger skips a tick
    /// rather than overlapping runs
    run_active: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: MeterConfig) -> Self {
        AppState {
            config: Arc::new(config),
            cache: Arc::new(RwLock::new(None)),
            run_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Try to claim the single run slot. Returns false if a run is already
    /// active.
    pub fn try_begin_run(&self) -> bool {
        !self.run_active.swap(true, Ordering::SeqCst)
    }

    /// Release the run slot once a run has ended, whatever its outcome.
    pub fn end_run(&self) {
        self.run_active.store(false, Ordering::SeqCst);
    }

    /// Snapshot of the current measurement for the HTTP layer.
    pub async fn measurement(&self) -> Option<SizeMeasurement> {
        self.cache.read().await.clone()
    }

    /// Atomically replace the cached measurement.
    pub async fn publish(&self, measurement: SizeMeasurement) {
        let mut guard = self.cache.write().await;
        *guard = Some(measurement);
    }
}
