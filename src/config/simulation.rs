//! Simulation driver configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::QueueError;
use crate::types::RoutingMode;

/// Configuration for the side-by-side strategy simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Probability of one arrival per tick, in [0, 1]
    pub arrival_rate: f64,
    /// Per-line probability of one service completion per tick
    pub service_rates: Vec<f64>,
    /// Wall time between ticks
    pub tick_interval_ms: u64,
    /// RNG seed; fixed seeds reproduce the exact event stream
    pub seed: Option<u64>,
    /// Export snapshots every this many ticks (0 disables export)
    pub export_every_ticks: u64,
    /// Attempt a history replay every this many ticks (0 disables)
    pub flush_every_ticks: u64,
    /// Stop after this many ticks; None runs until interrupted
    pub max_ticks: Option<u64>,
    /// One lane per entry: a fixed strategy name or "adaptive"
    pub lanes: Vec<LaneSettings>,
}

/// One strategy lane in the side-by-side comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSettings {
    /// Display name, also the suffix of the lane's sink namespace
    pub name: String,
    /// How arrivals are routed in this lane
    pub mode: RoutingMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arrival_rate: 0.5,
            service_rates: vec![0.08, 0.12, 0.18],
            tick_interval_ms: 2000,
            seed: None,
            export_every_ticks: 1,
            flush_every_ticks: 30,
            max_ticks: None,
            lanes: vec![
                LaneSettings {
                    name: "fewest-people".to_string(),
                    mode: RoutingMode::Fixed(crate::types::Strategy::FewestPeople),
                },
                LaneSettings {
                    name: "adaptive".to_string(),
                    mode: RoutingMode::Adaptive,
                },
                LaneSettings {
                    name: "farthest".to_string(),
                    mode: RoutingMode::Fixed(crate::types::Strategy::FarthestFromEntrance),
                },
            ],
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate against the engine's line count: every line needs a
    /// service rate, every rate must be a probability.
    pub fn validate(&self, number_of_lines: usize) -> Result<(), QueueError> {
        if !(0.0..=1.0).contains(&self.arrival_rate) {
            return Err(QueueError::Configuration {
                message: format!("arrival_rate must be in [0, 1], got {}", self.arrival_rate),
            });
        }
        if self.service_rates.len() < number_of_lines {
            return Err(QueueError::Configuration {
                message: format!(
                    "{} service rates configured for {} lines",
                    self.service_rates.len(),
                    number_of_lines
                ),
            });
        }
        for (i, rate) in self.service_rates.iter().enumerate() {
            if !(0.0..=1.0).contains(rate) {
                return Err(QueueError::Configuration {
                    message: format!("service rate for line {} must be in [0, 1], got {rate}", i + 1),
                });
            }
        }
        if self.tick_interval_ms == 0 {
            return Err(QueueError::Configuration {
                message: "tick_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.lanes.is_empty() {
            return Err(QueueError::Configuration {
                message: "at least one lane is required".to_string(),
            });
        }
        Ok(())
    }
}
