//! Materialized rows of the report table.

use crate::{
    error::Result, Error, FieldId, FieldValue, Fields, LogicalClock, ReplicaId, RowId, Timestamp,
    Version,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A live row.
///
/// Only created and changed by the projector. A deleted row is simply absent
/// from its [`Table`]; there is no tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Unique identifier for this row
    pub id: RowId,
    /// Cell values
    pub fields: Fields,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: ReplicaId,
    pub updated_by: ReplicaId,
    /// Number of operations folded into this row
    pub version: Version,
    /// Clock of the last applied operation
    pub clock: LogicalClock,
}

impl Row {
    /// Create a row at version 1.
    pub fn new(
        id: impl Into<RowId>,
        fields: Fields,
        timestamp: Timestamp,
        replica: impl Into<ReplicaId>,
        clock: LogicalClock,
    ) -> Self {
        let replica = replica.into();
        Self {
            id: id.into(),
            fields,
            created_at: timestamp,
            updated_at: timestamp,
            created_by: replica.clone(),
            updated_by: replica,
            version: 1,
            clock,
        }
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.fields.get(field_id)
    }

    /// Set one field and bump the version.
    pub fn set_field(
        &mut self,
        field_id: FieldId,
        value: FieldValue,
        timestamp: Timestamp,
        replica: ReplicaId,
        clock: LogicalClock,
    ) {
        self.fields.insert(field_id, value);
        self.version += 1;
        self.updated_at = timestamp;
        self.updated_by = replica;
        self.clock = clock;
    }
}

/// The live rows of a report, keyed by row id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: BTreeMap<RowId, Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Row> {
        self.rows.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Insert or replace a row.
    pub fn insert(&mut self, row: Row) {
        self.rows.insert(row.id.clone(), row);
    }

    pub fn remove(&mut self, id: &str) -> Option<Row> {
        self.rows.remove(id)
    }

    /// Rows in id order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }
}
