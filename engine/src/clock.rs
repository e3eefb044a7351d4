//! Vector clock for causal ordering of operations.
//!
//! Each replica owns exactly one slot and only ever increments that slot.
//! Clocks received from other replicas are folded in with [`LogicalClock::merge`].
//! Comparison is a partial order: two clocks may be [`CausalOrder::Concurrent`].

use crate::ReplicaId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of comparing two clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CausalOrder {
    /// Pointwise less than or equal to the other clock.
    Before,
    /// Pointwise greater than or equal to the other clock (and not equal).
    After,
    /// Neither clock dominates the other.
    Concurrent,
}

/// A per-replica vector of monotonically increasing counters.
///
/// Absent slots read as zero. Uses a `BTreeMap` so the serialized form has a
/// stable key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalClock {
    slots: BTreeMap<ReplicaId, u64>,
}

impl LogicalClock {
    /// Create an empty clock (every slot reads as zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock from explicit `(replica, counter)` pairs.
    pub fn from_entries<I, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (R, u64)>,
        R: Into<ReplicaId>,
    {
        Self {
            slots: entries.into_iter().map(|(r, c)| (r.into(), c)).collect(),
        }
    }

    /// Counter for a replica, zero if absent.
    pub fn get(&self, replica_id: &str) -> u64 {
        self.slots.get(replica_id).copied().unwrap_or(0)
    }

    /// Increment the slot owned by `replica_id` and return its new value.
    ///
    /// Must only be called by the owning replica.
    pub fn increment(&mut self, replica_id: &str) -> u64 {
        let slot = self.slots.entry(replica_id.to_string()).or_insert(0);
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Take the pointwise maximum with another clock.
    pub fn merge(&mut self, other: &LogicalClock) {
        for (replica, &counter) in &other.slots {
            let slot = self.slots.entry(replica.clone()).or_insert(0);
            *slot = (*slot).max(counter);
        }
    }

    /// Three-way causal comparison over the union of both key sets.
    ///
    /// Identical clocks compare as [`CausalOrder::Before`].
    pub fn compare(&self, other: &LogicalClock) -> CausalOrder {
        let mut less_or_equal = true;
        let mut greater_or_equal = true;

        for replica in self.slots.keys().chain(other.slots.keys()) {
            let mine = self.get(replica);
            let theirs = other.get(replica);
            if mine > theirs {
                less_or_equal = false;
            }
            if mine < theirs {
                greater_or_equal = false;
            }
            if !less_or_equal && !greater_or_equal {
                return CausalOrder::Concurrent;
            }
        }

        if less_or_equal {
            CausalOrder::Before
        } else {
            CausalOrder::After
        }
    }

    /// True if neither clock dominates the other.
    pub fn is_concurrent_with(&self, other: &LogicalClock) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }

    /// True if this clock is pointwise greater than or equal to `other`.
    pub fn dominates(&self, other: &LogicalClock) -> bool {
        other.compare(self) == CausalOrder::Before
    }

    /// Sum of all slots. Strictly increases along happened-before, so it is
    /// usable as the primary key of a linear extension of causal order.
    pub fn depth(&self) -> u64 {
        self.slots.values().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Immutable copy of the current slots.
    pub fn snapshot(&self) -> BTreeMap<ReplicaId, u64> {
        self.slots.clone()
    }

    /// True if no slot has ever been incremented or merged.
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(|&c| c == 0)
    }
}
