//! Conflict detection and resolution.
//!
//! Given every operation a replica knows about and a base table, this module
//! produces one consistent table plus a report of the conflicts it settled.
//!
//! # Algorithm
//!
//! 1. Drop duplicate operation ids and sort by `(created_at, origin_replica, id)`
//! 2. Partition the sorted operations into groups of causally concurrent,
//!    semantically conflicting operations (see [`GroupingStrategy`])
//! 3. Singleton groups are accepted as-is
//! 4. Larger groups keep one winner: any delete wins, otherwise the latest
//!    `created_at` wins with `origin_replica` breaking ties
//! 5. Fold the accepted operations onto the base table in causal order
//!
//! The result depends only on the set of operations, never on the order they
//! were received in.

use crate::{
    error::Result, project, Change, Error, FieldValue, Operation, OperationId, RowId, Table,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Label reported on every conflict record.
///
/// Delete-wins outcomes are reported under the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    #[default]
    #[serde(rename = "last-write-wins")]
    LastWriteWins,
}

/// How concurrent, conflicting operations are gathered into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupingStrategy {
    /// Each group is a seed operation plus every later, ungrouped operation
    /// that conflicts with the seed. Members are not checked against each
    /// other.
    #[default]
    Seed,
    /// Groups are the connected components of the conflicts-with relation.
    Closure,
}

/// Options for a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverOptions {
    pub grouping: GroupingStrategy,
}

/// One settled conflict group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    /// Row the group's seed operation targets
    pub row_id: RowId,
    pub resolved: bool,
    /// Id of the operation that was kept
    pub winner: OperationId,
    /// Value written by the winner; `None` when a delete won
    pub winning_value: Option<FieldValue>,
    /// Every other member of the group, in traversal order
    pub losing_operations: Vec<Operation>,
    pub strategy: ResolutionStrategy,
}

/// Output of a resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Materialized table
    pub rows: Table,
    /// One record per conflict group of two or more operations
    pub conflicts: Vec<ConflictRecord>,
    /// Operations that were folded onto the base table, in fold order
    pub accepted: Vec<OperationId>,
}

impl Resolution {
    /// Encode for the report renderer.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// True if neither operation's clock dominates the other's.
pub fn are_concurrent(a: &Operation, b: &Operation) -> bool {
    a.clock.is_concurrent_with(&b.clock)
}

/// True if `a` and `b` cannot both apply without ambiguity.
///
/// Requires the same row, and then either side being a delete or both being
/// updates of the same field. Insert against update never conflicts.
pub fn do_conflict(a: &Operation, b: &Operation) -> bool {
    if a.target_row_id != b.target_row_id {
        return false;
    }
    match (&a.change, &b.change) {
        (Change::Delete, _) | (_, Change::Delete) => true,
        (Change::Update { field_id: fa, .. }, Change::Update { field_id: fb, .. }) => fa == fb,
        _ => false,
    }
}

/// Resolves a combined operation set against a base table.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    options: ResolverOptions,
}

impl ConflictResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Resolve `ops` and project the result onto `base`.
    pub fn resolve(&self, ops: &[Operation], base: &Table) -> Resolution {
        let sorted = dedup_sorted(ops);
        let groups = match self.options.grouping {
            GroupingStrategy::Seed => seed_groups(&sorted),
            GroupingStrategy::Closure => closure_groups(&sorted),
        };

        let mut accepted: Vec<&Operation> = Vec::with_capacity(groups.len());
        let mut conflicts = Vec::new();

        for group in groups {
            let members: Vec<&Operation> = group.iter().map(|&i| sorted[i]).collect();
            if let [only] = members.as_slice() {
                accepted.push(*only);
                continue;
            }

            let winner = pick_winner(&members);
            let losing_operations: Vec<Operation> = members
                .iter()
                .filter(|op| op.id != winner.id)
                .map(|op| (*op).clone())
                .collect();

            debug!(
                row = %members[0].target_row_id,
                winner = %winner.id,
                losers = losing_operations.len(),
                "conflict resolved"
            );

            conflicts.push(ConflictRecord {
                row_id: members[0].target_row_id.clone(),
                resolved: true,
                winner: winner.id.clone(),
                winning_value: match &winner.change {
                    Change::Update { value, .. } => Some(value.clone()),
                    _ => None,
                },
                losing_operations,
                strategy: ResolutionStrategy::LastWriteWins,
            });
            accepted.push(winner);
        }

        accepted.sort_by(|a, b| a.causal_cmp(b));
        let rows = project::project(base, accepted.iter().copied());

        debug!(
            operations = sorted.len(),
            accepted = accepted.len(),
            conflicts = conflicts.len(),
            rows = rows.len(),
            "resolution pass complete"
        );

        Resolution {
            rows,
            conflicts,
            accepted: accepted.iter().map(|op| op.id.clone()).collect(),
        }
    }
}

/// Resolve with default options.
pub fn resolve_conflicts(ops: &[Operation], base: &Table) -> Resolution {
    ConflictResolver::default().resolve(ops, base)
}

/// Sort by tie-break order and keep the first occurrence of each id.
fn dedup_sorted(ops: &[Operation]) -> Vec<&Operation> {
    let mut sorted: Vec<&Operation> = ops.iter().collect();
    sorted.sort_by(|a, b| a.tiebreak_cmp(b));
    let mut seen = HashSet::with_capacity(sorted.len());
    sorted.retain(|&op| seen.insert(op.id.as_str()));
    sorted
}

fn conflicting(a: &Operation, b: &Operation) -> bool {
    do_conflict(a, b) && are_concurrent(a, b)
}

fn seed_groups(sorted: &[&Operation]) -> Vec<Vec<usize>> {
    let mut grouped = vec![false; sorted.len()];
    let mut groups = Vec::new();

    for seed in 0..sorted.len() {
        if grouped[seed] {
            continue;
        }
        grouped[seed] = true;
        let mut group = vec![seed];
        for other in seed + 1..sorted.len() {
            if !grouped[other] && conflicting(sorted[seed], sorted[other]) {
                grouped[other] = true;
                group.push(other);
            }
        }
        groups.push(group);
    }
    groups
}

fn closure_groups(sorted: &[&Operation]) -> Vec<Vec<usize>> {
    let mut sets = DisjointSets::new(sorted.len());
    for a in 0..sorted.len() {
        for b in a + 1..sorted.len() {
            if conflicting(sorted[a], sorted[b]) {
                sets.union(a, b);
            }
        }
    }

    // Components ordered by their first member; members stay in sorted order.
    let mut slot_of_root = vec![usize::MAX; sorted.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..sorted.len() {
        let root = sets.find(i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

fn pick_winner<'a>(members: &[&'a Operation]) -> &'a Operation {
    members
        .iter()
        .copied()
        .filter(|op| op.is_delete())
        .max_by(|a, b| a.tiebreak_cmp(b))
        .or_else(|| members.iter().copied().max_by(|a, b| a.tiebreak_cmp(b)))
        .unwrap_or(members[0])
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index becomes the root so roots are stable.
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }
}
