use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Every trial draws from this domain regardless of the stage being tested.
pub const SAMPLE_DOMAIN: RangeInclusive<u32> = 1..=100;

/// The four ordered stages of a run.
///
/// Each stage accepts a sample only if it lands in its own quarter of the
/// domain: 0-25, 25-50, 50-75, 75-100 (bounds inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    First,
    Second,
    Third,
    Fourth,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::First, Stage::Second, Stage::Third, Stage::Fourth];

    /// Zero-based position, as reported to clients in `BOX_UPDATE`.
    pub fn index(self) -> usize {
        match self {
            Stage::First => 0,
            Stage::Second => 1,
            Stage::Third => 2,
            Stage::Fourth => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    /// Inclusive acceptance range for this stage.
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            Stage::First => 0..=25,
            Stage::Second => 25..=50,
            Stage::Third => 50..=75,
            Stage::Fourth => 75..=100,
        }
    }

    pub fn accepts(self, value: u32) -> bool {
        self.range().contains(&value)
    }

    /// The stage that follows, or `None` after the last one.
    pub fn next(self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STAGE_{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_ordered_quarters() {
        let bounds: Vec<(u32, u32)> = Stage::ALL
            .iter()
            .map(|s| (*s.range().start(), *s.range().end()))
            .collect();
        assert_eq!(bounds, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(Stage::First.accepts(25));
        assert!(Stage::Second.accepts(25));
        assert!(Stage::Second.accepts(50));
        assert!(Stage::Fourth.accepts(100));
        assert!(!Stage::Fourth.accepts(74));
        assert!(!Stage::Third.accepts(76));
    }

    #[test]
    fn next_walks_in_order_and_stops() {
        assert_eq!(Stage::First.next(), Some(Stage::Second));
        assert_eq!(Stage::Third.next(), Some(Stage::Fourth));
        assert_eq!(Stage::Fourth.next(), None);
    }

    #[test]
    fn index_roundtrips() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_index(stage.index()), Some(stage));
        }
        assert_eq!(Stage::from_index(4), None);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::First.to_string(), "STAGE_0");
        assert_eq!(Stage::Fourth.to_string(), "STAGE_3");
    }
}
