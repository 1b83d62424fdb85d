//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use queue_pilot::clock::ManualClock;
use queue_pilot::config::{EngineConfig, SyncSettings};
use queue_pilot::engine::LineRouter;
use queue_pilot::error::{QueueError, Result};
use queue_pilot::sync::{InMemorySink, SyncSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sink wrapper that fails the first `failures` upserts, then delegates
///
/// Exercises the offline path: exports fail, the history buffer keeps
/// accumulating, and a later replay drains it once the sink "recovers".
pub struct FlakySink {
    inner: InMemorySink,
    remaining_failures: AtomicUsize,
}

impl FlakySink {
    pub fn failing(failures: usize) -> Self {
        Self {
            inner: InMemorySink::new(),
            remaining_failures: AtomicUsize::new(failures),
        }
    }

    /// Records currently stored behind the flaky facade
    pub fn stored(&self) -> usize {
        self.inner.len()
    }

    pub fn upserts_left_to_fail(&self) -> usize {
        self.remaining_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncSink for FlakySink {
    async fn upsert(&self, path: &str, json: &str) -> Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(QueueError::SyncFailed {
                path: path.to_string(),
                message: "simulated outage".to_string(),
            }
            .into());
        }
        self.inner.upsert(path, json).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn get(&self, path: &str) -> Result<Option<String>> {
        self.inner.get(path).await
    }
}

/// Router over `lines` unbounded lines on a shared manual clock
pub fn build_router(lines: usize) -> (LineRouter, Arc<ManualClock>) {
    build_router_with_capacity(lines, 0)
}

pub fn build_router_with_capacity(lines: usize, max_per_line: usize) -> (LineRouter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000_000));
    let config = EngineConfig {
        number_of_lines: lines,
        max_per_line,
        ..EngineConfig::default()
    };
    (LineRouter::new(&config, clock.clone()), clock)
}

/// Sync settings with no retry backoff, for fast tests
pub fn fast_sync_settings(namespace: &str) -> SyncSettings {
    SyncSettings {
        namespace: namespace.to_string(),
        retry_delay_ms: 0,
        ..SyncSettings::default()
    }
}
