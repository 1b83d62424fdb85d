//! Routing engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::estimator::EstimatorSettings;
use crate::engine::router::MAX_LINES;
use crate::error::QueueError;

/// Configuration for one [`LineRouter`](crate::engine::LineRouter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parallel service lines (1..=MAX_LINES)
    pub number_of_lines: usize,
    /// Per-line capacity; 0 means unbounded
    pub max_per_line: usize,
    /// How long admission snapshots are retained for offline replay
    pub history_retention_seconds: u64,
    /// Service-rate estimator tuning, shared by every line
    pub estimator: EstimatorSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            number_of_lines: 3,
            max_per_line: 50,
            history_retention_seconds: 3600, // one hour
            estimator: EstimatorSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history_retention_seconds)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.number_of_lines == 0 || self.number_of_lines > MAX_LINES {
            return Err(QueueError::Configuration {
                message: format!(
                    "number_of_lines must be within 1..={MAX_LINES}, got {}",
                    self.number_of_lines
                ),
            });
        }
        if self.history_retention_seconds == 0 {
            return Err(QueueError::Configuration {
                message: "history_retention_seconds must be greater than 0".to_string(),
            });
        }
        self.estimator.validate()
    }
}
