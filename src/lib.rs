//! Queue Pilot - Line routing and wait-time estimation service
//!
//! This crate routes arriving people across parallel service lines,
//! estimates per-line wait times from measured service rates, and keeps a
//! replayable history of admissions for when the remote sink is
//! unreachable.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod sim;
pub mod sync;
pub mod types;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use clock::{Clock, SystemClock};
pub use engine::{LineRouter, ServiceRateEstimator};
pub use sync::{StateExporter, SyncSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
