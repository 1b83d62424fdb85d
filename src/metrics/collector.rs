//! Metrics collection using Prometheus
//!
//! One collector serves every simulation lane; lane and line labels keep
//! the strategies separable on a dashboard.

use anyhow::{Context, Result};
use prometheus::{
    GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;

use crate::engine::router::LineRouter;
use crate::types::Strategy;

/// Wait times spread from sub-second to tens of minutes.
const WAIT_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Main metrics collector for the routing service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Queue state and flow
    queue_metrics: QueueMetrics,

    /// Sync boundary activity
    sync_metrics: SyncMetrics,
}

/// Queue-related metrics
#[derive(Clone)]
struct QueueMetrics {
    /// People currently in the system, per lane
    people_in_system: IntGaugeVec,

    /// People currently in each line, per lane
    people_in_line: IntGaugeVec,

    /// Admissions by lane and strategy
    admissions_total: IntCounterVec,

    /// Arrivals turned away because every line was full
    rejections_total: IntCounterVec,

    /// Service completions by lane and line
    departures_total: IntCounterVec,

    /// Predicted wait at admission time
    expected_wait_seconds: HistogramVec,

    /// Estimated service rate per lane and line
    service_rate: GaugeVec,

    /// Uptime gauge for the health endpoint
    uptime_seconds: IntGauge,
}

/// Sync-related metrics
#[derive(Clone)]
struct SyncMetrics {
    /// Completed exports per lane
    exports_total: IntCounterVec,

    /// Failed exports per lane
    export_failures_total: IntCounterVec,

    /// History records replayed after connectivity loss
    history_replayed_total: IntCounterVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let people_in_system = IntGaugeVec::new(
            Opts::new("queue_people_in_system", "People currently queued or served"),
            &["lane"],
        )
        .context("creating people_in_system")?;

        let people_in_line = IntGaugeVec::new(
            Opts::new("queue_people_in_line", "People currently in each line"),
            &["lane", "line"],
        )
        .context("creating people_in_line")?;

        let admissions_total = IntCounterVec::new(
            Opts::new("queue_admissions_total", "People admitted"),
            &["lane", "strategy"],
        )
        .context("creating admissions_total")?;

        let rejections_total = IntCounterVec::new(
            Opts::new("queue_rejections_total", "Arrivals turned away at capacity"),
            &["lane"],
        )
        .context("creating rejections_total")?;

        let departures_total = IntCounterVec::new(
            Opts::new("queue_departures_total", "Service completions"),
            &["lane", "line"],
        )
        .context("creating departures_total")?;

        let expected_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "queue_expected_wait_seconds",
                "Predicted wait at admission time",
            )
            .buckets(WAIT_BUCKETS.to_vec()),
            &["lane"],
        )
        .context("creating expected_wait_seconds")?;

        let service_rate = GaugeVec::new(
            Opts::new("queue_service_rate", "Estimated service rate, people per second"),
            &["lane", "line"],
        )
        .context("creating service_rate")?;

        let uptime_seconds = IntGauge::new("queue_uptime_seconds", "Service uptime")
            .context("creating uptime_seconds")?;

        let exports_total = IntCounterVec::new(
            Opts::new("sync_exports_total", "Completed state exports"),
            &["lane"],
        )
        .context("creating exports_total")?;

        let export_failures_total = IntCounterVec::new(
            Opts::new("sync_export_failures_total", "Failed state exports"),
            &["lane"],
        )
        .context("creating export_failures_total")?;

        let history_replayed_total = IntCounterVec::new(
            Opts::new("sync_history_replayed_total", "History records replayed"),
            &["lane"],
        )
        .context("creating history_replayed_total")?;

        registry
            .register(Box::new(people_in_system.clone()))
            .context("registering people_in_system")?;
        registry
            .register(Box::new(people_in_line.clone()))
            .context("registering people_in_line")?;
        registry
            .register(Box::new(admissions_total.clone()))
            .context("registering admissions_total")?;
        registry
            .register(Box::new(rejections_total.clone()))
            .context("registering rejections_total")?;
        registry
            .register(Box::new(departures_total.clone()))
            .context("registering departures_total")?;
        registry
            .register(Box::new(expected_wait_seconds.clone()))
            .context("registering expected_wait_seconds")?;
        registry
            .register(Box::new(service_rate.clone()))
            .context("registering service_rate")?;
        registry
            .register(Box::new(uptime_seconds.clone()))
            .context("registering uptime_seconds")?;
        registry
            .register(Box::new(exports_total.clone()))
            .context("registering exports_total")?;
        registry
            .register(Box::new(export_failures_total.clone()))
            .context("registering export_failures_total")?;
        registry
            .register(Box::new(history_replayed_total.clone()))
            .context("registering history_replayed_total")?;

        Ok(Self {
            registry: Arc::new(registry),
            queue_metrics: QueueMetrics {
                people_in_system,
                people_in_line,
                admissions_total,
                rejections_total,
                departures_total,
                expected_wait_seconds,
                service_rate,
                uptime_seconds,
            },
            sync_metrics: SyncMetrics {
                exports_total,
                export_failures_total,
                history_replayed_total,
            },
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn record_admission(&self, lane: &str, strategy: Strategy, expected_wait: f64) {
        self.queue_metrics
            .admissions_total
            .with_label_values(&[lane, &strategy.to_string()])
            .inc();
        self.queue_metrics
            .expected_wait_seconds
            .with_label_values(&[lane])
            .observe(expected_wait);
    }

    pub fn record_rejection(&self, lane: &str) {
        self.queue_metrics
            .rejections_total
            .with_label_values(&[lane])
            .inc();
    }

    pub fn record_departure(&self, lane: &str, line: usize) {
        self.queue_metrics
            .departures_total
            .with_label_values(&[lane, &line.to_string()])
            .inc();
    }

    /// Refresh the occupancy and rate gauges from the router's state
    pub fn update_lane_gauges(&self, lane: &str, router: &LineRouter) {
        self.queue_metrics
            .people_in_system
            .with_label_values(&[lane])
            .set(router.size() as i64);

        for line in 1..=router.number_of_lines() {
            let label = line.to_string();
            if let Ok(count) = router.line_count(line) {
                self.queue_metrics
                    .people_in_line
                    .with_label_values(&[lane, &label])
                    .set(count as i64);
            }
            if let Ok(estimator) = router.estimator(line) {
                self.queue_metrics
                    .service_rate
                    .with_label_values(&[lane, &label])
                    .set(estimator.current_rate());
            }
        }
    }

    pub fn record_export(&self, lane: &str, ok: bool) {
        if ok {
            self.sync_metrics
                .exports_total
                .with_label_values(&[lane])
                .inc();
        } else {
            self.sync_metrics
                .export_failures_total
                .with_label_values(&[lane])
                .inc();
        }
    }

    pub fn record_replay(&self, lane: &str, uploaded: usize) {
        self.sync_metrics
            .history_replayed_total
            .with_label_values(&[lane])
            .inc_by(uploaded as u64);
    }

    pub fn set_uptime(&self, seconds: i64) {
        self.queue_metrics.uptime_seconds.set(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;

    #[test]
    fn collector_registers_and_records() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_admission("adaptive", Strategy::FewestPeople, 12.0);
        collector.record_rejection("adaptive");
        collector.record_departure("adaptive", 2);
        collector.record_export("adaptive", true);
        collector.record_export("adaptive", false);
        collector.record_replay("adaptive", 7);
        collector.set_uptime(42);

        let families = collector.registry().gather();
        assert!(!families.is_empty());
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"queue_admissions_total".to_string()));
        assert!(names.contains(&"sync_history_replayed_total".to_string()));
    }

    #[test]
    fn lane_gauges_track_router_state() {
        let collector = MetricsCollector::new().unwrap();
        let cfg = EngineConfig {
            number_of_lines: 2,
            max_per_line: 0,
            ..EngineConfig::default()
        };
        let mut router = LineRouter::new(&cfg, std::sync::Arc::new(ManualClock::new()));
        router.admit_to(1).unwrap();
        router.admit_to(1).unwrap();

        collector.update_lane_gauges("fewest", &router);

        let families = collector.registry().gather();
        let in_system = families
            .iter()
            .find(|f| f.get_name() == "queue_people_in_system")
            .unwrap();
        assert_eq!(in_system.get_metric()[0].get_gauge().get_value(), 2.0);
    }
}
