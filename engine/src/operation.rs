//! Operation types for expressing row edits.
//!
//! Edits are never applied as direct mutations. Each one becomes an immutable
//! [`Operation`] stamped with the creating replica's clock, appended to the
//! local log and shipped to other replicas unchanged.

use crate::{
    error::Result, Error, FieldId, FieldValue, Fields, LogicalClock, ReplicaId, RowId, Timestamp,
};
use serde::de::{self, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for an operation.
pub type OperationId = String;

/// The edit an operation carries.
///
/// Flattened into [`Operation`] on the wire and tagged by `kind`.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a row with its initial fields.
    Insert { value: Fields },
    /// Set one field of an existing row.
    Update { field_id: FieldId, value: FieldValue },
    /// Remove a row.
    Delete,
    /// Any kind this build does not understand. Applies as a no-op but keeps
    /// the raw tag and payload so it is forwarded unchanged.
    Unknown { kind: String, payload: Map<String, Value> },
}

impl Change {
    pub fn insert(value: Fields) -> Self {
        Change::Insert { value }
    }

    pub fn update(field_id: impl Into<FieldId>, value: impl Into<FieldValue>) -> Self {
        Change::Update {
            field_id: field_id.into(),
            value: value.into(),
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Change::Insert { .. } => OpKind::Insert,
            Change::Update { .. } => OpKind::Update,
            Change::Delete => OpKind::Delete,
            Change::Unknown { .. } => OpKind::Unknown,
        }
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Change::Insert { value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("kind", "insert")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Change::Update { field_id, value } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("kind", "update")?;
                map.serialize_entry("fieldId", field_id)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Change::Delete => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("kind", "delete")?;
                map.end()
            }
            Change::Unknown { kind, payload } => {
                let mut map = serializer.serialize_map(Some(payload.len() + 1))?;
                map.serialize_entry("kind", kind)?;
                for (key, value) in payload {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Change {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut raw = Map::deserialize(deserializer)?;
        let kind = match raw.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => return Err(D::Error::custom(format!("invalid kind: {other}"))),
            None => return Err(D::Error::missing_field("kind")),
        };

        match kind.as_str() {
            "insert" => Ok(Change::Insert {
                value: take_field::<_, D::Error>(&mut raw, "value")?,
            }),
            "update" => Ok(Change::Update {
                field_id: take_field::<_, D::Error>(&mut raw, "fieldId")?,
                value: take_field::<_, D::Error>(&mut raw, "value")?,
            }),
            "delete" => Ok(Change::Delete),
            _ => Ok(Change::Unknown { kind, payload: raw }),
        }
    }
}

fn take_field<T, E>(raw: &mut Map<String, Value>, key: &'static str) -> std::result::Result<T, E>
where
    T: serde::de::DeserializeOwned,
    E: de::Error,
{
    let value = raw.remove(key).ok_or_else(|| E::missing_field(key))?;
    serde_json::from_value(value).map_err(E::custom)
}

/// Kind of an operation, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Insert,
    Update,
    Delete,
    Unknown,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Insert => write!(f, "insert"),
            OpKind::Update => write!(f, "update"),
            OpKind::Delete => write!(f, "delete"),
            OpKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single row edit, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Globally unique, prefixed with the origin replica
    pub id: OperationId,
    /// Kind and payload
    #[serde(flatten)]
    pub change: Change,
    /// Row this operation targets
    pub target_row_id: RowId,
    /// Wall-clock time of creation. Tie-break only, never causality.
    pub created_at: Timestamp,
    /// Replica that created the operation
    pub origin_replica: ReplicaId,
    /// Clock of the origin replica right after creating this operation
    pub clock: LogicalClock,
}

impl Operation {
    /// Create a new operation.
    pub fn new(
        id: impl Into<OperationId>,
        target_row_id: impl Into<RowId>,
        change: Change,
        created_at: Timestamp,
        origin_replica: impl Into<ReplicaId>,
        clock: LogicalClock,
    ) -> Self {
        Self {
            id: id.into(),
            change,
            target_row_id: target_row_id.into(),
            created_at,
            origin_replica: origin_replica.into(),
            clock,
        }
    }

    pub fn kind(&self) -> OpKind {
        self.change.kind()
    }

    /// Field targeted by an update, `None` for every other kind.
    pub fn field_id(&self) -> Option<&FieldId> {
        match &self.change {
            Change::Update { field_id, .. } => Some(field_id),
            _ => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.change, Change::Delete)
    }

    /// Deterministic order used where the clock cannot decide:
    /// `(created_at, origin_replica, id)`.
    pub fn tiebreak_cmp(&self, other: &Operation) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.origin_replica.cmp(&other.origin_replica))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Total order that extends causal order: clock depth first, then the
    /// tie-break order.
    pub fn causal_cmp(&self, other: &Operation) -> Ordering {
        self.clock
            .depth()
            .cmp(&other.clock.depth())
            .then_with(|| self.tiebreak_cmp(other))
    }

    /// Encode for the sync transport.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode an operation received from the sync transport.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}
