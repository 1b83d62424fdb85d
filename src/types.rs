//! Common types used throughout the queue routing service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 1-based index of a service line
pub type LineId = usize;

/// Sequential identifier assigned to each admitted person
pub type PersonId = u64;

/// Line selection strategy applied when a person is admitted
///
/// Strategies are chosen per call, not stored as engine-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Minimize the estimated wait for a newcomer; first line wins ties
    ShortestWait,
    /// Minimize current occupancy; lowest line number wins ties
    FewestPeople,
    /// Highest-numbered non-full line that has people, else highest non-full
    FarthestFromEntrance,
    /// Lowest-numbered non-full line that has people, else lowest non-full
    NearestToEntrance,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::ShortestWait
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::ShortestWait => write!(f, "shortest-wait"),
            Strategy::FewestPeople => write!(f, "fewest-people"),
            Strategy::FarthestFromEntrance => write!(f, "farthest-from-entrance"),
            Strategy::NearestToEntrance => write!(f, "nearest-to-entrance"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shortest-wait" | "shortest_wait" => Ok(Strategy::ShortestWait),
            "fewest-people" | "fewest_people" => Ok(Strategy::FewestPeople),
            "farthest-from-entrance" | "farthest" => Ok(Strategy::FarthestFromEntrance),
            "nearest-to-entrance" | "nearest" => Ok(Strategy::NearestToEntrance),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// How a simulation lane routes arrivals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMode {
    /// Always apply the same strategy
    Fixed(Strategy),
    /// Start with FewestPeople, switch to ShortestWait once enough
    /// completions have been observed
    Adaptive,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Fixed(s) => write!(f, "{s}"),
            RoutingMode::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("adaptive") {
            Ok(RoutingMode::Adaptive)
        } else {
            s.parse::<Strategy>().map(RoutingMode::Fixed)
        }
    }
}

/// Running totals over the whole life of a router
///
/// "Completed" counts people who reached the head of their line; the
/// realized wait therefore measures time-to-reach-head, not total time in
/// the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSummary {
    /// Everyone ever admitted
    pub total_people: u64,
    /// People currently standing in a line
    pub active_people: usize,
    /// People who have reached the head of their line
    pub completed_people: u64,
    /// Mean predicted wait over everyone ever admitted, in seconds
    pub average_expected_wait: f64,
    /// Mean realized wait over completed people, in seconds
    pub average_actual_wait: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_both_separators() {
        assert_eq!(
            "shortest-wait".parse::<Strategy>().unwrap(),
            Strategy::ShortestWait
        );
        assert_eq!(
            "fewest_people".parse::<Strategy>().unwrap(),
            Strategy::FewestPeople
        );
        assert_eq!(
            "farthest".parse::<Strategy>().unwrap(),
            Strategy::FarthestFromEntrance
        );
        assert!("closest".parse::<Strategy>().is_err());
    }

    #[test]
    fn routing_mode_parses_adaptive_and_fixed() {
        assert_eq!(
            "adaptive".parse::<RoutingMode>().unwrap(),
            RoutingMode::Adaptive
        );
        assert_eq!(
            "nearest-to-entrance".parse::<RoutingMode>().unwrap(),
            RoutingMode::Fixed(Strategy::NearestToEntrance)
        );
    }

    #[test]
    fn strategy_display_round_trips() {
        for s in [
            Strategy::ShortestWait,
            Strategy::FewestPeople,
            Strategy::FarthestFromEntrance,
            Strategy::NearestToEntrance,
        ] {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
    }
}
