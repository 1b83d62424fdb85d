//! Time sources for the routing engine
//!
//! All engine timing flows through an injected [`Clock`] so tests can run
//! against a deterministic clock: monotonic time drives rate measurement,
//! wall time identifies people and prunes history.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time
pub trait Clock: Send + Sync {
    /// Monotonic time elapsed since an arbitrary fixed origin
    fn monotonic(&self) -> Duration;

    /// Wall-clock time in milliseconds since the Unix epoch
    fn wall_ms(&self) -> i64;
}

/// Production clock backed by `Instant` and `SystemTime`
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock advanced explicitly by the caller
///
/// Shared via `Arc` between a test and the engine under test; both views
/// observe every `advance` immediately.
#[derive(Debug, Default)]
pub struct ManualClock {
    monotonic_ms: AtomicU64,
    wall_ms: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the wall clock at a specific epoch-ms value
    pub fn starting_at(wall_ms: i64) -> Self {
        let clock = Self::new();
        clock.wall_ms.store(wall_ms, Ordering::SeqCst);
        clock
    }

    /// Move both the monotonic and wall clocks forward
    pub fn advance(&self, by: Duration) {
        let ms = by.as_millis() as u64;
        self.monotonic_ms.fetch_add(ms, Ordering::SeqCst);
        self.wall_ms.fetch_add(ms as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.monotonic_ms.load(Ordering::SeqCst))
    }

    fn wall_ms(&self) -> i64 {
        self.wall_ms.load(Ordering::SeqCst)
    }
}
