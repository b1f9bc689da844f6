/*!
 * sharemeter - Shared-folder capacity exporter
 *
 * Periodically drives the size-calculation task on a NAS appliance's web
 * API and serves the most recent measurement over a local HTTP endpoint:
 * - Session-authenticated task protocol (discover, login, start, poll,
 *   stop, logout)
 * - Bounded restart on appliance-side task failure
 * - Atomically-swapped result cache, read-only HTTP surface
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod appliance;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use collector::SizeCollector;
pub use config::MeterConfig;
pub use error::{MeterError, Result};
pub use poller::Poller;
pub use state::{AppState, SizeMeasurement};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
