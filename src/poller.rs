//! Trigger loop for measurement runs
//!
//! One run fires at process start, then one per configured interval. The
//! loop never exits and never lets a failed run escape: errors are logged
//! with their context and the next tick proceeds as normal. A tick that
//! lands while a previous run is still polling is skipped.

use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::collector::SizeCollector;
use crate::error::MeterError;
use crate::state::AppState;

/// Fires measurement runs on a fixed cadence
pub struct Poller {
    state: AppState,
    collector: Arc<SizeCollector>,
}

impl Poller {
    pub fn new(state: AppState, collector: Arc<SizeCollector>) -> Self {
        Poller { state, collector }
    }

    /// Main trigger loop - runs forever. The first tick fires immediately.
    pub async fn run(self) {
        info!(
            "Trigger online - measuring '{}' every {}s",
            self.state.config.share_path, self.state.config.trigger_interval_secs
        );

        let mut interval = tokio::time::interval(self.state.config.trigger_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.fire().await;
        }
    }

    /// Run one measurement cycle, containing every failure mode.
    async fn fire(&self) {
        if !self.state.try_begin_run() {
            warn!("Previous measurement run still active; skipping this trigger");
            return;
        }

        let collector = Arc::clone(&self.collector);
        let handle = tokio::spawn(async move { collector.run().await });

        match handle.await {
            Ok(Ok(measurement)) => {
                info!(
                    "Measurement run complete: {} bytes ({:.2}% of capacity)",
                    measurement.current_size_bytes, measurement.used_percentage
                );
            }
            Ok(Err(e)) => {
                error!("Measurement run failed: {}", e);
            }
            Err(join_err) => {
                // A panic inside the run must not take the process down
                let e = MeterError::Unexpected(join_err.to_string());
                error!("Measurement run aborted: {}", e);
            }
        }

        self.state.end_run();
    }
}
