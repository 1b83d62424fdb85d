//! Main entry point for the Queue Pilot service
//!
//! Runs the side-by-side strategy simulation: one isolated router per
//! configured lane, a shared random event stream, periodic snapshot
//! export through the sync boundary, and a health/metrics endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use queue_pilot::clock::SystemClock;
use queue_pilot::config::{AppConfig, SyncSettings};
use queue_pilot::engine::LineRouter;
use queue_pilot::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use queue_pilot::sim::{SimulationDriver, StrategyLane};
use queue_pilot::sync::{InMemorySink, StateExporter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Queue Pilot - Line Routing and Wait-Time Estimation Service
#[derive(Parser)]
#[command(
    name = "queue-pilot",
    version,
    about = "Routes arrivals across parallel service lines and estimates waits",
    long_about = "Queue Pilot runs several line-selection strategies side by side against \
                 a shared random event stream, estimates per-line wait times from measured \
                 service rates, and publishes snapshots through a pluggable key-value sink."
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", help = "Path to configuration file (TOML format)")]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(short, long, value_name = "LEVEL", help = "Override log level (trace, debug, info, warn, error)")]
    log_level: Option<String>,

    /// Number of parallel lines
    #[arg(long, value_name = "N")]
    lines: Option<usize>,

    /// Per-line capacity (0 = unbounded)
    #[arg(long, value_name = "N")]
    max_per_line: Option<usize>,

    /// Probability of one arrival per tick
    #[arg(long, value_name = "P")]
    arrival_rate: Option<f64>,

    /// Per-line service probabilities, comma separated
    #[arg(long, value_name = "P,P,...", value_delimiter = ',')]
    service_rates: Option<Vec<f64>>,

    /// Milliseconds between ticks
    #[arg(long, value_name = "MS")]
    tick_interval_ms: Option<u64>,

    /// RNG seed for a reproducible event stream
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,

    /// Sink namespace prefix
    #[arg(long, value_name = "NS")]
    namespace: Option<String>,

    /// Health/metrics endpoint port override
    #[arg(long, value_name = "PORT")]
    health_port: Option<u16>,

    /// Print every sink record on exit
    #[arg(long)]
    dump_state: bool,
}

impl Args {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.service.log_level = level.clone();
        }
        if let Some(lines) = self.lines {
            config.engine.number_of_lines = lines;
        }
        if let Some(cap) = self.max_per_line {
            config.engine.max_per_line = cap;
        }
        if let Some(rate) = self.arrival_rate {
            config.simulation.arrival_rate = rate;
        }
        if let Some(rates) = &self.service_rates {
            config.simulation.service_rates = rates.clone();
        }
        if let Some(interval) = self.tick_interval_ms {
            config.simulation.tick_interval_ms = interval;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(ticks) = self.ticks {
            config.simulation.max_ticks = Some(ticks);
        }
        if let Some(namespace) = &self.namespace {
            config.sync.namespace = namespace.clone();
        }
        if let Some(port) = self.health_port {
            config.service.health_port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(&config.service.log_level);
    info!(
        service = %config.service.name,
        version = queue_pilot::VERSION,
        lines = config.engine.number_of_lines,
        max_per_line = config.engine.max_per_line,
        lanes = config.simulation.lanes.len(),
        "starting queue-pilot"
    );

    let metrics = Arc::new(MetricsCollector::new().context("creating metrics collector")?);

    let health = Arc::new(HealthServer::new(
        HealthServerConfig {
            port: config.service.health_port,
            ..HealthServerConfig::default()
        },
        Arc::clone(&metrics),
        config.service.name.clone(),
    ));
    let health_task = tokio::spawn({
        let health = Arc::clone(&health);
        async move {
            if let Err(e) = health.start().await {
                error!("health server failed: {e:#}");
            }
        }
    });

    // One shared wall/monotonic clock; each lane gets its own router and
    // its own namespace under the shared sink.
    let clock = Arc::new(SystemClock::new());
    let sink = Arc::new(InMemorySink::new());
    let mut lanes = Vec::with_capacity(config.simulation.lanes.len());
    for lane_config in &config.simulation.lanes {
        let router = LineRouter::new(&config.engine, clock.clone());
        let exporter = StateExporter::new(
            sink.clone(),
            SyncSettings {
                namespace: format!("{}_{}", config.sync.namespace, lane_config.name),
                ..config.sync.clone()
            },
        );
        exporter
            .clear_remote(config.engine.number_of_lines)
            .await
            .with_context(|| format!("clearing remote state for lane {}", lane_config.name))?;

        info!(
            lane = %lane_config.name,
            mode = %lane_config.mode,
            namespace = %exporter.namespace(),
            "lane initialized"
        );
        lanes.push(StrategyLane::new(
            lane_config.name.clone(),
            lane_config.mode,
            router,
            Some(exporter),
        ));
    }

    let mut driver = SimulationDriver::new(lanes, config.simulation.clone(), metrics);

    tokio::select! {
        result = driver.run() => {
            result.context("simulation driver failed")?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!(ticks = driver.ticks(), "simulation finished");
    driver.log_summary();

    if args.dump_state {
        for (path, json) in sink.dump() {
            println!("{path} {json}");
        }
    }

    health.shutdown();
    let _ = health_task.await;
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
