//! Caller-driven state export and history replay
//!
//! The driver decides when to publish; the exporter turns router state
//! into snapshot records and pushes them through the [`SyncSink`]. Each
//! export writes one record per line, the aggregate, the cumulative
//! summary, and a capped number of individual person records. History
//! replay re-uploads everything admitted while the sink was unreachable
//! and clears the buffer only when every record made it through.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::engine::router::LineRouter;
use crate::sync::sink::SyncSink;
use crate::sync::snapshot::{paths, AggregateSnapshot, LineSnapshot, PersonRecord, SummaryRecord};

/// Outcome of one history replay attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Records successfully upserted
    pub uploaded: usize,
    /// Records attempted
    pub total: usize,
    /// Whether the buffer was cleared (only after a full success)
    pub cleared: bool,
}

/// Publishes router snapshots through a [`SyncSink`]
pub struct StateExporter {
    sink: Arc<dyn SyncSink>,
    settings: SyncSettings,
}

impl StateExporter {
    pub fn new(sink: Arc<dyn SyncSink>, settings: SyncSettings) -> Self {
        Self { sink, settings }
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Remove any previously exported records for this namespace
    ///
    /// Called once at startup so a fresh run never shows stale lines.
    pub async fn clear_remote(&self, number_of_lines: usize) -> Result<()> {
        let ns = &self.settings.namespace;
        for line in 1..=number_of_lines {
            self.sink
                .delete(&paths::line(ns, line))
                .await
                .with_context(|| format!("clearing line {line}"))?;
        }
        self.sink
            .delete(&paths::aggregate(ns))
            .await
            .context("clearing aggregate")?;
        self.sink
            .delete(&paths::summary(ns))
            .await
            .context("clearing summary")?;
        info!(namespace = %ns, "cleared remote state");
        Ok(())
    }

    /// Publish the router's current state
    pub async fn export_state(&self, router: &LineRouter) -> Result<()> {
        let ns = self.settings.namespace.clone();
        let lines = LineSnapshot::collect(router);

        for line in &lines {
            let json = serde_json::to_string(line).context("serializing line snapshot")?;
            self.upsert_with_retry(&paths::line(&ns, line.line), &json)
                .await?;
            debug!(
                line = line.line,
                occupancy = line.occupancy,
                rate = line.service_rate,
                wait = line.estimated_wait,
                measured = line.measured,
                "line exported"
            );
        }

        let aggregate = AggregateSnapshot::build(router, &lines);
        let json = serde_json::to_string(&aggregate).context("serializing aggregate")?;
        self.upsert_with_retry(&paths::aggregate(&ns), &json).await?;

        let summary = SummaryRecord::build(router);
        let json = serde_json::to_string(&summary).context("serializing summary")?;
        self.upsert_with_retry(&paths::summary(&ns), &json).await?;

        // Individual person records, capped to keep export volume sane.
        let mut written = 0;
        for person in router.all_people() {
            if written >= self.settings.max_people_per_export {
                break;
            }
            let record = PersonRecord::from(&person);
            let json = serde_json::to_string(&record).context("serializing person record")?;
            self.upsert_with_retry(&paths::person(&ns, &record.person_id), &json)
                .await?;
            written += 1;
        }

        debug!(
            namespace = %ns,
            lines = lines.len(),
            people = written,
            "state exported"
        );
        Ok(())
    }

    /// Replay buffered admissions after a connectivity loss
    ///
    /// Partial failure keeps the buffer intact so the caller can simply
    /// invoke this again; only a fully successful replay clears it.
    pub async fn flush_history(&self, router: &mut LineRouter) -> Result<FlushReport> {
        router.prune_history();

        let entries: Vec<PersonRecord> = router.history().iter().map(PersonRecord::from).collect();
        let total = entries.len();
        if total == 0 {
            debug!("no history to replay");
            return Ok(FlushReport {
                uploaded: 0,
                total: 0,
                cleared: false,
            });
        }

        let ns = self.settings.namespace.clone();
        let mut uploaded = 0;
        for record in &entries {
            let json = serde_json::to_string(record).context("serializing history record")?;
            match self
                .upsert_with_retry(&paths::person(&ns, &record.person_id), &json)
                .await
            {
                Ok(()) => uploaded += 1,
                Err(error) => {
                    warn!(person = %record.person_id, %error, "history record upload failed");
                }
            }
        }

        // The summary travels with the replay so the remote totals match
        // the replayed people.
        let summary = SummaryRecord::build(router);
        let json = serde_json::to_string(&summary).context("serializing summary")?;
        let summary_ok = self.upsert_with_retry(&paths::summary(&ns), &json).await.is_ok();

        let cleared = uploaded == total && summary_ok;
        if cleared {
            router.clear_history();
            info!(uploaded, "history replayed and cleared");
        } else {
            warn!(
                uploaded,
                total, "history replay incomplete, keeping buffer for retry"
            );
        }

        Ok(FlushReport {
            uploaded,
            total,
            cleared,
        })
    }

    /// Upsert with bounded retries and a fixed delay between attempts
    async fn upsert_with_retry(&self, path: &str, json: &str) -> Result<()> {
        let attempts = self.settings.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.sink.upsert(path, json).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    debug!(%path, attempt, %error, "upsert attempt failed");
                    last_error = Some(error);
                    if attempt < attempts {
                        tokio::time::sleep(self.delay()).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("upsert failed"))
            .context(format!("upsert to {path} failed after {attempts} attempts")))
    }

    fn delay(&self) -> Duration {
        self.settings.retry_delay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::sync::sink::InMemorySink;

    fn settings(namespace: &str) -> SyncSettings {
        SyncSettings {
            namespace: namespace.to_string(),
            retry_delay_ms: 0,
            ..SyncSettings::default()
        }
    }

    fn build_router(lines: usize) -> LineRouter {
        let cfg = EngineConfig {
            number_of_lines: lines,
            max_per_line: 0,
            ..EngineConfig::default()
        };
        LineRouter::new(&cfg, Arc::new(ManualClock::starting_at(1_000_000)))
    }

    #[tokio::test]
    async fn export_writes_one_path_per_record() {
        let sink = Arc::new(InMemorySink::new());
        let exporter = StateExporter::new(sink.clone(), settings("sim"));
        let mut router = build_router(2);
        router.admit_to(1).unwrap();
        router.admit_to(1).unwrap();

        exporter.export_state(&router).await.unwrap();

        assert!(sink.get("sim/queues/line1").await.unwrap().is_some());
        assert!(sink.get("sim/queues/line2").await.unwrap().is_some());
        assert!(sink.get("sim/currentBest").await.unwrap().is_some());
        assert!(sink.get("sim/people_summary").await.unwrap().is_some());
        assert!(sink.get("sim/people/person_1").await.unwrap().is_some());
        assert!(sink.get("sim/people/person_2").await.unwrap().is_some());
        // 2 lines + aggregate + summary + 2 people
        assert_eq!(sink.len(), 6);
    }

    #[tokio::test]
    async fn export_caps_person_records() {
        let sink = Arc::new(InMemorySink::new());
        let mut s = settings("sim");
        s.max_people_per_export = 3;
        let exporter = StateExporter::new(sink.clone(), s);

        let mut router = build_router(1);
        for _ in 0..10 {
            router.admit_to(1).unwrap();
        }
        exporter.export_state(&router).await.unwrap();

        let people = sink
            .dump()
            .into_iter()
            .filter(|(path, _)| path.starts_with("sim/people/person_"))
            .count();
        assert_eq!(people, 3);
    }

    #[tokio::test]
    async fn clear_remote_removes_exported_paths() {
        let sink = Arc::new(InMemorySink::new());
        let exporter = StateExporter::new(sink.clone(), settings("sim"));
        let mut router = build_router(2);
        router.admit_to(1).unwrap();
        exporter.export_state(&router).await.unwrap();

        exporter.clear_remote(router.number_of_lines()).await.unwrap();
        assert!(sink.get("sim/queues/line1").await.unwrap().is_none());
        assert!(sink.get("sim/currentBest").await.unwrap().is_none());
        assert!(sink.get("sim/people_summary").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn successful_flush_clears_history() {
        let sink = Arc::new(InMemorySink::new());
        let exporter = StateExporter::new(sink.clone(), settings("sim"));
        let mut router = build_router(1);
        router.admit_to(1).unwrap();
        router.admit_to(1).unwrap();
        assert_eq!(router.history().len(), 2);

        let report = exporter.flush_history(&mut router).await.unwrap();
        assert_eq!(
            report,
            FlushReport {
                uploaded: 2,
                total: 2,
                cleared: true
            }
        );
        assert!(router.history().is_empty());
        assert!(sink.get("sim/people/person_1").await.unwrap().is_some());
        assert!(sink.get("sim/people_summary").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_flush_is_a_no_op() {
        let sink = Arc::new(InMemorySink::new());
        let exporter = StateExporter::new(sink.clone(), settings("sim"));
        let mut router = build_router(1);

        let report = exporter.flush_history(&mut router).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(!report.cleared);
        assert!(sink.is_empty());
    }
}
