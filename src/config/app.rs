//! Main application configuration
//!
//! Configuration loads in layers: built-in defaults (the constants the
//! production deployment has always run with), an optional TOML file, and
//! environment variable overrides. Everything is validated before the
//! engine is constructed.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::config::engine::EngineConfig;
use crate::config::simulation::SimulationConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub engine: EngineConfig,
    pub sync: SyncSettings,
    pub simulation: SimulationConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the health and metrics endpoint
    pub health_port: u16,
}

/// Remote sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Path prefix for every exported record
    pub namespace: String,
    /// Cap on individual person records written per export
    pub max_people_per_export: usize,
    /// Attempts per upsert before giving up
    pub max_retries: u32,
    /// Delay between upsert attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "queue-pilot".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            namespace: "simulation".to_string(),
            max_people_per_export: 50,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl SyncSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from defaults plus env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(name) = env::var("QP_SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("QP_LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("QP_HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid QP_HEALTH_PORT value: {}", port))?;
        }
        if let Ok(lines) = env::var("QP_NUMBER_OF_LINES") {
            self.engine.number_of_lines = lines
                .parse()
                .map_err(|_| anyhow!("Invalid QP_NUMBER_OF_LINES value: {}", lines))?;
        }
        if let Ok(cap) = env::var("QP_MAX_PER_LINE") {
            self.engine.max_per_line = cap
                .parse()
                .map_err(|_| anyhow!("Invalid QP_MAX_PER_LINE value: {}", cap))?;
        }
        if let Ok(retention) = env::var("QP_HISTORY_RETENTION_SECONDS") {
            self.engine.history_retention_seconds = retention
                .parse()
                .map_err(|_| anyhow!("Invalid QP_HISTORY_RETENTION_SECONDS value: {}", retention))?;
        }
        if let Ok(namespace) = env::var("QP_SYNC_NAMESPACE") {
            self.sync.namespace = namespace;
        }
        if let Ok(rate) = env::var("QP_ARRIVAL_RATE") {
            self.simulation.arrival_rate = rate
                .parse()
                .map_err(|_| anyhow!("Invalid QP_ARRIVAL_RATE value: {}", rate))?;
        }
        if let Ok(seed) = env::var("QP_SEED") {
            self.simulation.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("Invalid QP_SEED value: {}", seed))?,
            );
        }
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        match self.service.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(anyhow!("Invalid log level: {other}")),
        }
        if self.service.health_port == 0 {
            return Err(anyhow!("Health port cannot be 0"));
        }
        if self.sync.namespace.is_empty() {
            return Err(anyhow!("Sync namespace cannot be empty"));
        }
        self.engine.validate()?;
        self.simulation.validate(self.engine.number_of_lines)?;
        Ok(())
    }
}
