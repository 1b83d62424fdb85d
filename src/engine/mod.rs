//! Core routing and estimation engine
//!
//! This is the algorithmic heart of the service: line selection, per-line
//! service-rate estimation, and the offline history buffer. The engine is
//! synchronous and performs no I/O; one logical owner mutates one
//! [`LineRouter`] at a time, and anything that talks to the outside world
//! lives behind the sync boundary instead.

pub mod estimator;
pub mod history;
pub mod person;
pub mod router;

// Re-export commonly used types
pub use estimator::{EstimatorSettings, ServiceRateEstimator};
pub use history::HistoryBuffer;
pub use person::Person;
pub use router::{LineRouter, ADAPTIVE_COMPLETION_THRESHOLD, MAX_LINES};
