//! Configuration management for the queue-pilot service
//!
//! This module handles all configuration loading from defaults, TOML
//! files, and environment variables, with validation before the engine
//! is constructed.

pub mod app;
pub mod engine;
pub mod simulation;

// Re-export commonly used types
pub use app::{AppConfig, ServiceSettings, SyncSettings};
pub use engine::EngineConfig;
pub use simulation::{LaneSettings, SimulationConfig};
