//! Replica - one editing session's clock and operation log.
//!
//! A replica is logically single-threaded: local edits and received
//! operations are applied one at a time. Callers sharing a replica between
//! threads must lock around `create_operation`, `receive_operation` and
//! `resolve` as a unit, since resolution reads a stable view of the log.

use crate::{
    error::Result, Change, ConflictResolver, Error, LogicalClock, Operation, OperationLog,
    ReplicaId, Resolution, ResolverOptions, RowId, Table, Timestamp,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Replica {
    replica_id: ReplicaId,
    clock: LogicalClock,
    log: OperationLog,
    options: ResolverOptions,
}

impl Replica {
    /// Create a replica for a session. The id must be stable and unique per
    /// session and is supplied by the embedding application.
    pub fn new(replica_id: impl Into<ReplicaId>) -> Result<Self> {
        let replica_id = replica_id.into();
        if replica_id.trim().is_empty() {
            return Err(Error::InvalidReplicaId(replica_id));
        }
        Ok(Self {
            replica_id,
            clock: LogicalClock::new(),
            log: OperationLog::new(),
            options: ResolverOptions::default(),
        })
    }

    /// Builder-style resolver options.
    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica_id
    }

    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Record a local edit.
    ///
    /// Increments this replica's own clock slot exactly once, stamps the
    /// operation with the new clock and `now`, appends it to the log and
    /// returns it for transmission.
    pub fn create_operation(
        &mut self,
        row_id: impl Into<RowId>,
        change: Change,
        now: Timestamp,
    ) -> Operation {
        let counter = self.clock.increment(&self.replica_id);
        let op = Operation::new(
            format!("{}-{}", self.replica_id, counter),
            row_id,
            change,
            now,
            self.replica_id.clone(),
            self.clock.clone(),
        );
        debug!(op_id = %op.id, kind = %op.kind(), row = %op.target_row_id, "operation created");
        self.log.append(op.clone());
        op
    }

    /// Accept an operation from another replica.
    ///
    /// Merges its clock and appends it. Returns `false` if the operation was
    /// already in the log.
    pub fn receive_operation(&mut self, op: Operation) -> bool {
        self.clock.merge(&op.clock);
        let op_id = op.id.clone();
        let appended = self.log.append(op);
        if !appended {
            debug!(op_id = %op_id, replica = %self.replica_id, "duplicate operation ignored");
        }
        appended
    }

    /// Operations created after `since` (all if `None`), in log order.
    pub fn get_pending_operations(&self, since: Option<Timestamp>) -> Vec<Operation> {
        self.log.pending(since)
    }

    /// Drop operations created before `before`. Returns how many were dropped.
    ///
    /// Only safe once every replica has received the dropped operations;
    /// nothing here checks that.
    pub fn clear_synced_operations(&mut self, before: Timestamp) -> usize {
        let dropped = self.log.clear_before(before);
        debug!(replica = %self.replica_id, dropped, before, "synced operations cleared");
        dropped
    }

    /// Resolve the whole log against `base` with this replica's options.
    pub fn resolve(&self, base: &Table) -> Resolution {
        self.resolve_with(base, self.options)
    }

    pub fn resolve_with(&self, base: &Table, options: ResolverOptions) -> Resolution {
        ConflictResolver::new(options).resolve(self.log.as_slice(), base)
    }
}
