//! Sync boundary: the remote sink contract and the state exporter
//!
//! The engine never performs I/O. The driver calls into this module after
//! a batch of mutations to publish snapshots, and after a connectivity
//! loss to replay the history buffer.

pub mod exporter;
pub mod sink;
pub mod snapshot;

// Re-export commonly used types
pub use exporter::{FlushReport, StateExporter};
pub use sink::{InMemorySink, SyncSink};
pub use snapshot::{AggregateSnapshot, LineSnapshot, PersonRecord, SummaryRecord};
