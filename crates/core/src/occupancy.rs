//! Equipment placement on a relay board.
//!
//! Each piece of equipment occupies a contiguous, inclusive range of
//! 1-based relay numbers. Ranges on the same board never overlap.

use serde::{Deserialize, Serialize};

/// A contiguous block of relays `[start, start + count - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRange {
    pub start: i32,
    pub count: i32,
}

impl RelayRange {
    pub fn new(start: i32, count: i32) -> Self {
        Self { start, count }
    }

    /// Last relay number in the range (inclusive).
    pub fn end(&self) -> i32 {
        self.start + self.count - 1
    }

    pub fn contains(&self, relay_number: i32) -> bool {
        relay_number >= self.start && relay_number <= self.end()
    }

    pub fn overlaps(&self, other: &RelayRange) -> bool {
        self.start <= other.end() && self.end() >= other.start
    }

    /// Whether the range lies within `[1, total_relays]`.
    pub fn fits(&self, total_relays: i32) -> bool {
        self.count > 0 && self.start >= 1 && self.end() <= total_relays
    }
}

/// Every start position where a block of `relay_count` relays fits on a
/// board of `total_relays` without touching an occupied range.
///
/// Positions are returned in ascending order; the first one is the default
/// placement for new equipment.
pub fn find_available_slots(total_relays: i32, occupied: &[RelayRange], relay_count: i32) -> Vec<i32> {
    if relay_count <= 0 || relay_count > total_relays {
        return Vec::new();
    }

    (1..=total_relays - relay_count + 1)
        .filter(|&start| {
            let candidate = RelayRange::new(start, relay_count);
            !occupied.iter().any(|range| candidate.overlaps(range))
        })
        .collect()
}
