//! Line routing and queue state
//!
//! [`LineRouter`] owns the parallel FIFO lines, one rate estimator per
//! line, the offline history buffer, and the running totals. It is a
//! single-owner structure: no internal locking, no I/O, no background
//! work. The driver admits on arrival, departs on service completion, and
//! reads snapshots between mutations.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::estimator::ServiceRateEstimator;
use crate::engine::history::HistoryBuffer;
use crate::engine::person::Person;
use crate::error::QueueError;
use crate::types::{CumulativeSummary, LineId, PersonId, Strategy};

/// Historical cap on the number of lines, inherited from the device build
pub const MAX_LINES: usize = 10;

/// Completions observed before the adaptive mode trusts wait estimates
/// enough to switch from FewestPeople to ShortestWait.
pub const ADAPTIVE_COMPLETION_THRESHOLD: u64 = 30;

/// Router over N parallel service lines
pub struct LineRouter {
    lines: Vec<VecDeque<Person>>,
    estimators: Vec<ServiceRateEstimator>,
    history: HistoryBuffer,
    clock: Arc<dyn Clock>,
    /// Per-line capacity; 0 means unbounded
    max_per_line: usize,
    total_people: usize,
    next_person_id: PersonId,
    total_admitted: u64,
    total_completed: u64,
    sum_expected_wait: f64,
    sum_actual_wait: f64,
    last_selected: Option<LineId>,
}

impl LineRouter {
    /// Build a router from validated configuration
    ///
    /// The line count is clamped to [`MAX_LINES`] regardless of input.
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let lines = config.number_of_lines.min(MAX_LINES);
        let now = clock.monotonic();
        Self {
            lines: (0..lines).map(|_| VecDeque::new()).collect(),
            estimators: (0..lines)
                .map(|_| ServiceRateEstimator::new(config.estimator, now))
                .collect(),
            history: HistoryBuffer::new(config.history_retention()),
            clock,
            max_per_line: config.max_per_line,
            total_people: 0,
            next_person_id: 1,
            total_admitted: 0,
            total_completed: 0,
            sum_expected_wait: 0.0,
            sum_actual_wait: 0.0,
            last_selected: None,
        }
    }

    // ----- admission ----------------------------------------------------

    /// Admit a new arrival on the line chosen by `strategy`
    pub fn admit(&mut self, strategy: Strategy) -> Result<LineId, QueueError> {
        let line = self.next_line(strategy).ok_or(QueueError::NoCapacity)?;
        self.admit_at(line)
    }

    /// Admit a new arrival on an explicitly chosen line
    pub fn admit_to(&mut self, line: LineId) -> Result<LineId, QueueError> {
        let idx = self.check_line(line)?;
        if self.line_is_full(idx) {
            return Err(QueueError::NoCapacity);
        }
        self.admit_at(line)
    }

    /// Admit using the adaptive strategy (see [`Self::auto_strategy`])
    pub fn admit_auto(&mut self) -> Result<LineId, QueueError> {
        self.admit(self.auto_strategy())
    }

    fn admit_at(&mut self, line: LineId) -> Result<LineId, QueueError> {
        let idx = line - 1;
        debug_assert!(!self.line_is_full(idx));

        let expected_wait = self.wait_for_newcomer(idx);
        let wall = self.clock.wall_ms();
        let person = Person::new(self.next_person_id, line, expected_wait, wall);
        self.next_person_id += 1;

        // The history snapshot is taken before any head-of-line stamping,
        // so replayed records show the person as still waiting.
        self.history.record(person.clone(), wall);

        self.lines[idx].push_back(person);
        self.total_people += 1;
        self.total_admitted += 1;
        self.sum_expected_wait += expected_wait;

        // A sole occupant is immediately "being served": their wait to
        // reach the head of the line was zero.
        if self.lines[idx].len() == 1 {
            self.stamp_head(idx, wall);
        }

        self.last_selected = Some(line);
        Ok(line)
    }

    // ----- departure ----------------------------------------------------

    /// Complete service on `line`: pop its head and promote the successor
    pub fn depart(&mut self, line: LineId) -> Result<(), QueueError> {
        let idx = self.check_line(line)?;
        if self.lines[idx].is_empty() {
            return Err(QueueError::EmptyLine { line });
        }

        self.lines[idx].pop_front();
        self.total_people -= 1;

        let wall = self.clock.wall_ms();
        self.stamp_head(idx, wall);

        // Completions are recorded only on a successful pop.
        self.estimators[idx].record_completion(self.clock.monotonic());
        Ok(())
    }

    /// Complete service on the line the adaptive strategy currently
    /// recommends
    pub fn depart_auto(&mut self) -> Result<(), QueueError> {
        let line = self.next_line_auto().ok_or(QueueError::NoCapacity)?;
        self.depart(line)
    }

    /// Stamp the head of line `idx` if present and not yet stamped
    fn stamp_head(&mut self, idx: usize, wall: i64) {
        if let Some(head) = self.lines[idx].front_mut() {
            if !head.has_exited() {
                head.record_exit(wall);
                self.total_completed += 1;
                self.sum_actual_wait += head.actual_wait();
            }
        }
    }

    // ----- selection ----------------------------------------------------

    /// Line a newcomer would be routed to under `strategy`, if any line
    /// has free capacity
    pub fn next_line(&self, strategy: Strategy) -> Option<LineId> {
        if self.lines.is_empty() {
            return None;
        }
        match strategy {
            Strategy::ShortestWait => self.pick_min_by(|idx| self.wait_for_newcomer(idx)),
            Strategy::FewestPeople => self.pick_min_by(|idx| self.lines[idx].len() as f64),
            Strategy::FarthestFromEntrance => self.pick_occupied_or_open((0..self.lines.len()).rev()),
            Strategy::NearestToEntrance => self.pick_occupied_or_open(0..self.lines.len()),
        }
    }

    /// Line the adaptive mode would pick right now
    pub fn next_line_auto(&self) -> Option<LineId> {
        self.next_line(self.auto_strategy())
    }

    /// Strategy the adaptive mode is currently operating under
    ///
    /// Wait estimates are noise until enough completions have been
    /// observed, so the adaptive mode starts with plain occupancy
    /// counting and switches permanently once the threshold is crossed.
    pub fn auto_strategy(&self) -> Strategy {
        if self.total_completed < ADAPTIVE_COMPLETION_THRESHOLD {
            Strategy::FewestPeople
        } else {
            Strategy::ShortestWait
        }
    }

    /// Lowest-indexed non-full line minimizing `score`; strict comparison
    /// keeps the first line encountered on ties.
    fn pick_min_by(&self, score: impl Fn(usize) -> f64) -> Option<LineId> {
        let mut best: Option<(usize, f64)> = None;
        for idx in 0..self.lines.len() {
            if self.line_is_full(idx) {
                continue;
            }
            let s = score(idx);
            match best {
                Some((_, current)) if s >= current => {}
                _ => best = Some((idx, s)),
            }
        }
        best.map(|(idx, _)| idx + 1)
    }

    /// First non-full line in `order` that has people; failing that, the
    /// first non-full line in `order`.
    fn pick_occupied_or_open(&self, order: impl Iterator<Item = usize>) -> Option<LineId> {
        let mut fallback = None;
        for idx in order {
            if self.line_is_full(idx) {
                continue;
            }
            if !self.lines[idx].is_empty() {
                return Some(idx + 1);
            }
            if fallback.is_none() {
                fallback = Some(idx + 1);
            }
        }
        fallback
    }

    // ----- administrative overrides -------------------------------------

    /// Overwrite a line's occupancy with `count` placeholder people
    ///
    /// Used when an external observer (or a test harness) knows the real
    /// occupancy better than the event stream. Placeholders carry the
    /// line's current wait estimate, re-evaluated as the line refills;
    /// the lifetime counters and the history buffer are untouched.
    pub fn set_line_count(&mut self, line: LineId, count: usize) -> Result<(), QueueError> {
        let idx = self.check_line(line)?;

        self.total_people -= self.lines[idx].len();
        self.lines[idx].clear();

        let wall = self.clock.wall_ms();
        for _ in 0..count {
            let expected_wait = self.wait_for_newcomer(idx);
            let person = Person::new(self.next_person_id, line, expected_wait, wall);
            self.next_person_id += 1;
            self.lines[idx].push_back(person);
        }
        self.total_people += count;
        Ok(())
    }

    /// Return to the just-constructed state: empty lines, zeroed
    /// counters, fresh estimator sessions, empty history
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        let now = self.clock.monotonic();
        for estimator in &mut self.estimators {
            estimator.reset(now);
        }
        self.history.clear();
        self.total_people = 0;
        self.total_admitted = 0;
        self.total_completed = 0;
        self.sum_expected_wait = 0.0;
        self.sum_actual_wait = 0.0;
        self.last_selected = None;
    }

    // ----- read model ---------------------------------------------------

    /// People currently standing in any line
    pub fn size(&self) -> usize {
        self.total_people
    }

    pub fn is_empty(&self) -> bool {
        self.total_people == 0
    }

    pub fn number_of_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn max_per_line(&self) -> usize {
        self.max_per_line
    }

    pub fn line_count(&self, line: LineId) -> Result<usize, QueueError> {
        Ok(self.lines[self.check_line(line)?].len())
    }

    /// Estimated wait in seconds for a newcomer joining `line` now
    pub fn estimated_wait(&self, line: LineId) -> Result<f64, QueueError> {
        Ok(self.wait_for_newcomer(self.check_line(line)?))
    }

    /// As [`Self::estimated_wait`], refined with an observed arrival rate
    pub fn estimated_wait_with_arrivals(
        &self,
        line: LineId,
        arrival_rate: f64,
    ) -> Result<f64, QueueError> {
        let idx = self.check_line(line)?;
        Ok(self.estimators[idx].estimate_wait(self.lines[idx].len(), arrival_rate))
    }

    /// Everyone currently standing in a line, in line order then FIFO order
    pub fn all_people(&self) -> Vec<Person> {
        self.lines.iter().flatten().cloned().collect()
    }

    pub fn people_in_line(&self, line: LineId) -> Result<Vec<Person>, QueueError> {
        Ok(self.lines[self.check_line(line)?].iter().cloned().collect())
    }

    /// Lifetime totals and averages
    pub fn summary(&self) -> CumulativeSummary {
        CumulativeSummary {
            total_people: self.total_admitted,
            active_people: self.total_people,
            completed_people: self.total_completed,
            average_expected_wait: if self.total_admitted > 0 {
                self.sum_expected_wait / self.total_admitted as f64
            } else {
                0.0
            },
            average_actual_wait: if self.total_completed > 0 {
                self.sum_actual_wait / self.total_completed as f64
            } else {
                0.0
            },
        }
    }

    /// Line chosen by the most recent successful admission
    pub fn last_selected(&self) -> Option<LineId> {
        self.last_selected
    }

    /// The rate estimator backing `line`, for reporting
    pub fn estimator(&self, line: LineId) -> Result<&ServiceRateEstimator, QueueError> {
        Ok(&self.estimators[self.check_line(line)?])
    }

    // ----- history ------------------------------------------------------

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Drop history entries that have aged out of the retention window
    pub fn prune_history(&mut self) {
        let wall = self.clock.wall_ms();
        self.history.prune(wall);
    }

    /// Forget the history buffer, after a fully successful replay
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ----- internals ----------------------------------------------------

    fn check_line(&self, line: LineId) -> Result<usize, QueueError> {
        if line >= 1 && line <= self.lines.len() {
            Ok(line - 1)
        } else {
            Err(QueueError::InvalidLine {
                line,
                lines: self.lines.len(),
            })
        }
    }

    fn line_is_full(&self, idx: usize) -> bool {
        self.max_per_line > 0 && self.lines[idx].len() >= self.max_per_line
    }

    /// Wait for a newcomer: everyone currently in the line is ahead of them
    fn wait_for_newcomer(&self, idx: usize) -> f64 {
        self.estimators[idx].estimate_wait(self.lines[idx].len(), 0.0)
    }
}
