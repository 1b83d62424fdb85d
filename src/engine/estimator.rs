//! Per-line service-rate estimation and wait-time prediction
//!
//! Each line carries one estimator that counts service completions against
//! the monotonic clock. While few completions have been observed the rate
//! is a blend of the configured prior and the measurement; once the
//! completion count crosses the reliability threshold the measurement
//! stands alone. Estimates are clamped so a burst of completions in a
//! short window can never produce a divide-by-near-zero wait.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::QueueError;

/// Utilization above which the M/M/1 refinement is abandoned in favor of
/// the plain `queue_len / rate` estimate.
const MAX_STABLE_UTILIZATION: f64 = 0.95;

/// Tuning knobs for [`ServiceRateEstimator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// Assumed service rate before any measurement, people per second
    pub prior_rate: f64,
    /// Lower clamp on the estimated rate, people per second
    pub min_rate: f64,
    /// Upper clamp on the estimated rate, people per second
    pub max_rate: f64,
    /// Completions required before the measured rate stands on its own
    pub reliability_threshold: u32,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            prior_rate: 0.1,
            min_rate: 0.1,
            max_rate: 5.0,
            reliability_threshold: 5,
        }
    }
}

impl EstimatorSettings {
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.min_rate <= 0.0 || self.max_rate <= self.min_rate {
            return Err(QueueError::Configuration {
                message: format!(
                    "rate bounds must satisfy 0 < min < max, got [{}, {}]",
                    self.min_rate, self.max_rate
                ),
            });
        }
        if self.prior_rate < self.min_rate || self.prior_rate > self.max_rate {
            return Err(QueueError::Configuration {
                message: format!(
                    "prior_rate {} is outside [{}, {}]",
                    self.prior_rate, self.min_rate, self.max_rate
                ),
            });
        }
        if self.reliability_threshold == 0 {
            return Err(QueueError::Configuration {
                message: "reliability_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Service throughput tracker for a single line
#[derive(Debug, Clone)]
pub struct ServiceRateEstimator {
    settings: EstimatorSettings,
    completions: u32,
    session_start: Duration,
    current_rate: f64,
}

impl ServiceRateEstimator {
    /// Create an estimator whose measurement session starts at `now`
    pub fn new(settings: EstimatorSettings, now: Duration) -> Self {
        Self {
            current_rate: settings.prior_rate.clamp(settings.min_rate, settings.max_rate),
            completions: 0,
            session_start: now,
            settings,
        }
    }

    /// Record one service completion observed at monotonic time `now`
    ///
    /// Below the reliability threshold the new rate is a linear blend of
    /// the prior and the observed `completions / elapsed`, weighted by
    /// `completions / threshold`; at or above the threshold the observed
    /// rate stands alone. Either way the result is clamped to the
    /// configured bounds.
    pub fn record_completion(&mut self, now: Duration) {
        self.completions += 1;

        let elapsed = now.saturating_sub(self.session_start).as_secs_f64();
        let observed = if elapsed > 0.0 {
            self.completions as f64 / elapsed
        } else {
            // Zero elapsed time: the measurement is meaningless, treat it
            // as saturation and let the clamp bound it.
            self.settings.max_rate
        };

        let threshold = self.settings.reliability_threshold;
        let rate = if self.completions >= threshold {
            observed
        } else {
            let confidence = self.completions as f64 / threshold as f64;
            self.settings.prior_rate * (1.0 - confidence) + observed * confidence
        };

        self.current_rate = rate.clamp(self.settings.min_rate, self.settings.max_rate);
    }

    /// Estimated wait in seconds for a line currently `queue_len` deep
    ///
    /// With a positive `arrival_rate` and utilization below the stability
    /// margin, the plain `queue_len / rate` figure is refined with the
    /// M/M/1 queue-wait formula scaled to the actual queue length. At or
    /// beyond the margin the refinement is numerically useless and the
    /// plain figure is returned instead.
    pub fn estimate_wait(&self, queue_len: usize, arrival_rate: f64) -> f64 {
        if queue_len == 0 {
            return 0.0;
        }

        let rate = self.current_rate;
        let basic = queue_len as f64 / rate;

        if arrival_rate > 0.0 {
            let utilization = arrival_rate / rate;
            if utilization < MAX_STABLE_UTILIZATION {
                let avg_service_time = 1.0 / rate;
                let avg_wait_in_queue = utilization / (1.0 - utilization) * avg_service_time;
                let theoretical_queue_len = utilization * utilization / (1.0 - utilization);
                if theoretical_queue_len > 0.0 {
                    return avg_wait_in_queue * (queue_len as f64 / theoretical_queue_len);
                }
            }
        }

        basic
    }

    /// Current service rate, people per second
    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    /// Completions observed in this measurement session
    pub fn completions(&self) -> u32 {
        self.completions
    }

    /// Whether enough completions back the estimate for it to be reported
    /// as measured rather than assumed
    pub fn has_reliable_data(&self) -> bool {
        self.completions >= self.settings.reliability_threshold
    }

    /// Session length in seconds as of monotonic time `now`
    pub fn session_seconds(&self, now: Duration) -> f64 {
        now.saturating_sub(self.session_start).as_secs_f64()
    }

    /// Start a fresh measurement session at monotonic time `now`
    pub fn reset(&mut self, now: Duration) {
        self.completions = 0;
        self.session_start = now;
        self.current_rate = self
            .settings
            .prior_rate
            .clamp(self.settings.min_rate, self.settings.max_rate);
    }
}
