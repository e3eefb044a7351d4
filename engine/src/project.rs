//! Folding operations onto a table of rows.
//!
//! Projection never fails. Operations whose precondition does not hold are
//! skipped: an insert for an existing id, an update or delete for a missing
//! row, and any operation of unknown kind.

use crate::{Change, Operation, Row, Table};
use tracing::trace;

/// Whether `op` would change `rows` if applied.
///
/// Inserts require the row to be absent, updates and deletes require it to
/// be present. Unknown kinds never apply.
pub fn can_apply_operation(op: &Operation, rows: &Table) -> bool {
    match op.change {
        Change::Insert { .. } => !rows.contains(&op.target_row_id),
        Change::Update { .. } | Change::Delete => rows.contains(&op.target_row_id),
        Change::Unknown { .. } => false,
    }
}

/// Apply one operation to `rows`. Returns `true` if the table changed.
pub fn apply_operation(op: &Operation, rows: &mut Table) -> bool {
    let applied = match &op.change {
        Change::Insert { value } => {
            if rows.contains(&op.target_row_id) {
                false
            } else {
                rows.insert(Row::new(
                    op.target_row_id.clone(),
                    value.clone(),
                    op.created_at,
                    op.origin_replica.clone(),
                    op.clock.clone(),
                ));
                true
            }
        }
        Change::Update { field_id, value } => match rows.get_mut(&op.target_row_id) {
            Some(row) => {
                row.set_field(
                    field_id.clone(),
                    value.clone(),
                    op.created_at,
                    op.origin_replica.clone(),
                    op.clock.clone(),
                );
                true
            }
            None => false,
        },
        Change::Delete => rows.remove(&op.target_row_id).is_some(),
        Change::Unknown { .. } => false,
    };

    if !applied {
        trace!(op_id = %op.id, kind = %op.kind(), row = %op.target_row_id, "operation skipped");
    }
    applied
}

/// Fold `ops`, in the given order, onto a copy of `base`.
pub fn project<'a>(base: &Table, ops: impl IntoIterator<Item = &'a Operation>) -> Table {
    let mut rows = base.clone();
    for op in ops {
        apply_operation(op, &mut rows);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fields;
    use crate::{FieldValue, LogicalClock};

    fn op(id: &str, row: &str, change: Change, at: u64) -> Operation {
        let replica = id.split('-').next().unwrap_or("a");
        Operation::new(
            id,
            row,
            change,
            at,
            replica,
            LogicalClock::from_entries([(replica, at)]),
        )
    }

    fn insert(id: &str, row: &str, at: u64) -> Operation {
        op(id, row, Change::insert(fields([("qty", 1i64)])), at)
    }

    #[test]
    fn insert_creates_row_at_version_one() {
        let mut rows = Table::new();
        assert!(apply_operation(&insert("a-1", "row-1", 1), &mut rows));

        let row = rows.get("row-1").unwrap();
        assert_eq!(row.version, 1);
        assert_eq!(row.created_by, "a");
        assert_eq!(row.get("qty"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn duplicate_insert_keeps_first_writer() {
        let mut rows = Table::new();
        apply_operation(&insert("a-1", "row-1", 1), &mut rows);
        let second = op("b-1", "row-1", Change::insert(fields([("qty", 9i64)])), 2);

        assert!(!can_apply_operation(&second, &rows));
        assert!(!apply_operation(&second, &mut rows));
        assert_eq!(rows.get("row-1").unwrap().created_by, "a");
        assert_eq!(
            rows.get("row-1").unwrap().get("qty"),
            Some(&FieldValue::Number(1.0))
        );
    }

    #[test]
    fn update_sets_field_and_bumps_version() {
        let mut rows = Table::new();
        apply_operation(&insert("a-1", "row-1", 1), &mut rows);
        apply_operation(&op("b-2", "row-1", Change::update("qty", 5i64), 2), &mut rows);

        let row = rows.get("row-1").unwrap();
        assert_eq!(row.version, 2);
        assert_eq!(row.updated_by, "b");
        assert_eq!(row.updated_at, 2);
        assert_eq!(row.clock.get("b"), 2);
        assert_eq!(row.get("qty"), Some(&FieldValue::Number(5.0)));
    }

    #[test]
    fn update_on_absent_row_is_noop() {
        let mut rows = Table::new();
        let update = op("a-1", "row-1", Change::update("qty", 5i64), 1);
        assert!(!can_apply_operation(&update, &rows));
        assert!(!apply_operation(&update, &mut rows));
        assert!(rows.is_empty());
    }

    #[test]
    fn delete_removes_row_and_is_noop_when_absent() {
        let mut rows = Table::new();
        apply_operation(&insert("a-1", "row-1", 1), &mut rows);
        let delete = op("a-2", "row-1", Change::Delete, 2);

        assert!(can_apply_operation(&delete, &rows));
        assert!(apply_operation(&delete, &mut rows));
        assert!(!rows.contains("row-1"));
        assert!(!apply_operation(&delete, &mut rows));
    }

    #[test]
    fn reinsert_after_delete_starts_fresh() {
        let rows = project(
            &Table::new(),
            &[
                insert("a-1", "row-1", 1),
                op("a-2", "row-1", Change::update("qty", 3i64), 2),
                op("a-3", "row-1", Change::Delete, 3),
                insert("a-4", "row-1", 4),
            ],
        );
        let row = rows.get("row-1").unwrap();
        assert_eq!(row.version, 1);
        assert_eq!(row.created_at, 4);
    }

    #[test]
    fn unknown_kind_never_applies() {
        let mut rows = Table::new();
        apply_operation(&insert("a-1", "row-1", 1), &mut rows);
        let unknown = op(
            "a-2",
            "row-1",
            Change::Unknown {
                kind: "archive".into(),
                payload: Default::default(),
            },
            2,
        );

        assert!(!can_apply_operation(&unknown, &rows));
        assert!(!apply_operation(&unknown, &mut rows));
        assert_eq!(rows.get("row-1").unwrap().version, 1);
    }

    #[test]
    fn project_leaves_base_untouched() {
        let base = project(&Table::new(), &[insert("a-1", "row-1", 1)]);
        let next = project(&base, &[op("a-2", "row-1", Change::Delete, 2)]);
        assert!(base.contains("row-1"));
        assert!(next.is_empty());
    }
}
