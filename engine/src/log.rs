//! Append-only, replica-local operation log.
//!
//! The log keeps operations in the order they were appended and indexes them
//! by id so that receiving the same operation twice is a no-op.

use crate::{Operation, OperationId, Timestamp};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Vec<Operation>,
    index: HashMap<OperationId, usize>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation unless one with the same id is already present.
    ///
    /// Returns `true` if the operation was appended.
    pub fn append(&mut self, op: Operation) -> bool {
        if self.index.contains_key(&op.id) {
            return false;
        }
        self.index.insert(op.id.clone(), self.entries.len());
        self.entries.push(op);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Operations with `created_at > since` (all of them if `since` is `None`),
    /// in log order.
    pub fn pending(&self, since: Option<Timestamp>) -> Vec<Operation> {
        self.entries
            .iter()
            .filter(|op| since.map_or(true, |t| op.created_at > t))
            .cloned()
            .collect()
    }

    /// Drop operations with `created_at < before`. Returns how many were
    /// dropped.
    ///
    /// Nothing here checks that every replica has seen the dropped
    /// operations; callers own that decision.
    pub fn clear_before(&mut self, before: Timestamp) -> usize {
        let len = self.entries.len();
        self.entries.retain(|op| op.created_at >= before);
        let dropped = len - self.entries.len();
        if dropped > 0 {
            self.reindex();
        }
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, op)| (op.id.clone(), i))
            .collect();
    }
}

impl FromIterator<Operation> for OperationLog {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut log = OperationLog::new();
        for op in iter {
            log.append(op);
        }
        log
    }
}
