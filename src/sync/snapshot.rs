//! Snapshot types written through the sync boundary
//!
//! One record per line, one aggregate ("which line should a newcomer
//! join"), one cumulative people summary, and one record per person. The
//! exact path strings live in [`paths`]; one path per (line, aggregate,
//! person, summary) is part of the contract with the remote store.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::person::Person;
use crate::engine::router::LineRouter;
use crate::types::LineId;

/// State of one service line at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub line: LineId,
    pub occupancy: usize,
    /// Estimated service rate, people per second
    pub service_rate: f64,
    /// Estimated wait for a newcomer, seconds
    pub estimated_wait: f64,
    /// Whether the rate is measured or still the configured prior
    pub measured: bool,
}

impl LineSnapshot {
    /// Snapshot every line of `router`, in line order
    pub fn collect(router: &LineRouter) -> Vec<LineSnapshot> {
        (1..=router.number_of_lines())
            .map(|line| {
                // Lines are enumerated from the router itself, so the
                // lookups cannot fail.
                let estimator = router.estimator(line).expect("line enumerated from router");
                LineSnapshot {
                    line,
                    occupancy: router.line_count(line).expect("line enumerated from router"),
                    service_rate: estimator.current_rate(),
                    estimated_wait: router.estimated_wait(line).expect("line enumerated from router"),
                    measured: estimator.has_reliable_data(),
                }
            })
            .collect()
    }
}

/// The aggregate record surfaced to displays: where a newcomer should go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub total_people: usize,
    pub number_of_lines: usize,
    pub recommended_line: Option<LineId>,
    /// Estimated wait on the recommended line, seconds
    pub estimated_wait: f64,
    /// Occupancy of the recommended line
    pub occupancy: usize,
    /// Line chosen by the most recent admission, for display
    pub last_selected: Option<LineId>,
    pub updated_at: String,
}

impl AggregateSnapshot {
    pub fn build(router: &LineRouter, lines: &[LineSnapshot]) -> Self {
        let recommended = recommended_line(lines);
        let (estimated_wait, occupancy) = recommended
            .and_then(|line| lines.iter().find(|l| l.line == line))
            .map(|l| (l.estimated_wait, l.occupancy))
            .unwrap_or((0.0, 0));

        Self {
            total_people: router.size(),
            number_of_lines: router.number_of_lines(),
            recommended_line: recommended,
            estimated_wait,
            occupancy,
            last_selected: router.last_selected(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Display-side recommendation: the line with the lowest estimated wait,
/// preferring fewer people when waits are within half a second of each
/// other.
pub fn recommended_line(lines: &[LineSnapshot]) -> Option<LineId> {
    let mut best: Option<&LineSnapshot> = None;
    for candidate in lines {
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let close = (candidate.estimated_wait - current.estimated_wait).abs() < 0.5;
                if close && candidate.occupancy < current.occupancy {
                    Some(candidate)
                } else if !close && candidate.estimated_wait < current.estimated_wait {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.map(|l| l.line)
}

/// One person's record as written to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub line: LineId,
    /// Predicted wait at admission, seconds
    pub expected_wait: f64,
    /// Admission timestamp, epoch milliseconds
    pub entered_at: i64,
    /// Head-of-line timestamp, epoch milliseconds; absent while waiting
    pub left_at: Option<i64>,
    /// Realized wait, seconds; 0 while waiting
    pub actual_wait: f64,
    pub has_exited: bool,
}

impl From<&Person> for PersonRecord {
    fn from(person: &Person) -> Self {
        Self {
            person_id: record_key(person),
            line: person.line(),
            expected_wait: person.expected_wait(),
            entered_at: person.entered_at(),
            left_at: person.left_at(),
            actual_wait: person.actual_wait(),
            has_exited: person.has_exited(),
        }
    }
}

/// Stable sink identifier for a person
pub fn record_key(person: &Person) -> String {
    format!("person_{}", person.id())
}

/// Cumulative people statistics as written to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub total_people: u64,
    pub active_people: usize,
    pub completed_people: u64,
    pub average_expected_wait: f64,
    pub average_actual_wait: f64,
    pub updated_at: String,
}

impl SummaryRecord {
    pub fn build(router: &LineRouter) -> Self {
        let summary = router.summary();
        Self {
            total_people: summary.total_people,
            active_people: summary.active_people,
            completed_people: summary.completed_people,
            average_expected_wait: summary.average_expected_wait,
            average_actual_wait: summary.average_actual_wait,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Sink path scheme: one path per line, aggregate, person, and summary
pub mod paths {
    use crate::types::LineId;

    pub fn line(namespace: &str, line: LineId) -> String {
        format!("{namespace}/queues/line{line}")
    }

    pub fn aggregate(namespace: &str) -> String {
        format!("{namespace}/currentBest")
    }

    pub fn person(namespace: &str, key: &str) -> String {
        format!("{namespace}/people/{key}")
    }

    pub fn summary(namespace: &str) -> String {
        format!("{namespace}/people_summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use std::sync::Arc;

    fn router(lines: usize) -> LineRouter {
        let cfg = EngineConfig {
            number_of_lines: lines,
            max_per_line: 0,
            ..EngineConfig::default()
        };
        LineRouter::new(&cfg, Arc::new(ManualClock::starting_at(1_000_000)))
    }

    fn snap(line: LineId, occupancy: usize, wait: f64) -> LineSnapshot {
        LineSnapshot {
            line,
            occupancy,
            service_rate: 0.1,
            estimated_wait: wait,
            measured: false,
        }
    }

    #[test]
    fn recommendation_minimizes_wait() {
        let lines = vec![snap(1, 5, 50.0), snap(2, 2, 20.0), snap(3, 4, 40.0)];
        assert_eq!(recommended_line(&lines), Some(2));
    }

    #[test]
    fn recommendation_breaks_close_waits_by_occupancy() {
        // Waits within half a second of each other: fewer people wins.
        let lines = vec![snap(1, 5, 20.3), snap(2, 2, 20.0)];
        assert_eq!(recommended_line(&lines), Some(2));

        let lines = vec![snap(1, 1, 20.3), snap(2, 2, 20.0)];
        assert_eq!(recommended_line(&lines), Some(1));

        assert_eq!(recommended_line(&[]), None);
    }

    #[test]
    fn line_snapshots_cover_every_line() {
        let mut router = router(3);
        router.admit_to(2).unwrap();
        router.admit_to(2).unwrap();

        let lines = LineSnapshot::collect(&router);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].line, 2);
        assert_eq!(lines[1].occupancy, 2);
        assert_eq!(lines[0].occupancy, 0);
        assert_eq!(lines[0].estimated_wait, 0.0);
        assert!(!lines[1].measured);
        assert!(lines[1].estimated_wait > 0.0);
    }

    #[test]
    fn aggregate_points_at_the_recommended_line() {
        let mut router = router(2);
        router.admit_to(1).unwrap();
        router.admit_to(1).unwrap();
        router.admit_to(1).unwrap();

        let lines = LineSnapshot::collect(&router);
        let aggregate = AggregateSnapshot::build(&router, &lines);

        assert_eq!(aggregate.total_people, 3);
        assert_eq!(aggregate.recommended_line, Some(2));
        assert_eq!(aggregate.occupancy, 0);
        assert_eq!(aggregate.estimated_wait, 0.0);
        assert_eq!(aggregate.last_selected, Some(1));
    }

    #[test]
    fn person_record_mirrors_person_state() {
        let mut person = Person::new(42, 3, 7.5, 1_000_000);
        let record = PersonRecord::from(&person);
        assert_eq!(record.person_id, "person_42");
        assert_eq!(record.line, 3);
        assert_eq!(record.left_at, None);
        assert!(!record.has_exited);
        assert_eq!(record.actual_wait, 0.0);

        person.record_exit(1_004_000);
        let record = PersonRecord::from(&person);
        assert_eq!(record.left_at, Some(1_004_000));
        assert!(record.has_exited);
        assert_eq!(record.actual_wait, 4.0);
    }

    #[test]
    fn paths_follow_the_contract() {
        assert_eq!(paths::line("sim", 2), "sim/queues/line2");
        assert_eq!(paths::aggregate("sim"), "sim/currentBest");
        assert_eq!(paths::person("sim", "person_7"), "sim/people/person_7");
        assert_eq!(paths::summary("sim"), "sim/people_summary");
    }

    #[test]
    fn snapshots_serialize_to_json() {
        let record = SummaryRecord {
            total_people: 10,
            active_people: 4,
            completed_people: 6,
            average_expected_wait: 12.5,
            average_actual_wait: 11.0,
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: SummaryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
