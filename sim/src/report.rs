//! Outcome of a simulation run.

use gridsync_engine::{ReplicaId, Resolution};
use serde::Serialize;

/// Summary printed at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub seed: u64,
    pub replicas: usize,
    /// Distinct operations created across all sessions
    pub operations: usize,
    /// Deliveries made by the relay, duplicates included
    pub deliveries: usize,
    /// Live rows in the reconciled table
    pub rows: usize,
    pub conflicts: usize,
    /// True when every replica resolved to the same table and conflicts
    pub converged: bool,
    /// Replicas whose resolution differs from the first replica's
    pub divergent: Vec<ReplicaId>,
}

impl Report {
    /// Compare every replica's resolution against the first one.
    pub fn from_resolutions(
        seed: u64,
        operations: usize,
        deliveries: usize,
        resolutions: &[(ReplicaId, Resolution)],
    ) -> Self {
        let reference = resolutions.first().map(|(_, r)| r);
        let divergent: Vec<ReplicaId> = resolutions
            .iter()
            .filter(|(_, r)| Some(r) != reference)
            .map(|(id, _)| id.clone())
            .collect();

        Self {
            seed,
            replicas: resolutions.len(),
            operations,
            deliveries,
            rows: reference.map_or(0, |r| r.rows.len()),
            conflicts: reference.map_or(0, |r| r.conflicts.len()),
            converged: divergent.is_empty(),
            divergent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_engine::{value::fields, Change, Replica, Table};

    #[test]
    fn detects_divergence() {
        let mut a = Replica::new("a").unwrap();
        a.create_operation("row-1", Change::insert(fields([("qty", 1i64)])), 1);
        let b = Replica::new("b").unwrap();

        let same = Report::from_resolutions(
            0,
            1,
            0,
            &[
                ("a".into(), a.resolve(&Table::new())),
                ("a2".into(), a.resolve(&Table::new())),
            ],
        );
        assert!(same.converged);
        assert_eq!(same.rows, 1);

        let split = Report::from_resolutions(
            0,
            1,
            0,
            &[
                ("a".into(), a.resolve(&Table::new())),
                ("b".into(), b.resolve(&Table::new())),
            ],
        );
        assert!(!split.converged);
        assert_eq!(split.divergent, vec!["b".to_string()]);
    }
}
