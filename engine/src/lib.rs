//! # Gridsync Engine
//!
//! Lock-free concurrent editing of a shared report table.
//!
//! Every user session is a [`Replica`] that records edits as immutable
//! [`Operation`]s stamped with a vector clock. Replicas exchange operations
//! over whatever channel the embedding application provides (delivery may be
//! out of order or duplicated), and any replica can later reconcile the
//! combined log into one table plus a list of settled conflicts.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, network or the system clock
//! - **Deterministic**: the same operation set always yields the same table
//! - **Total**: resolution and projection never fail; invalid edits are no-ops
//!
//! ## Core Concepts
//!
//! ### Logical Clock
//!
//! [`LogicalClock`] is a vector clock with one slot per replica. Comparison is
//! a partial order: [`CausalOrder::Before`], [`CausalOrder::After`] or
//! [`CausalOrder::Concurrent`]. Wall-clock time is only ever a tie-breaker.
//!
//! ### Operations
//!
//! An operation carries a [`Change`]:
//! - `Insert` - create a row with its initial fields
//! - `Update` - set one field of an existing row
//! - `Delete` - remove a row
//!
//! ### Conflict Resolution
//!
//! Two operations conflict when they are causally concurrent, target the same
//! row, and either one is a delete or both update the same field. A delete
//! always wins its group; otherwise the latest write wins. See [`resolve`].
//!
//! ## Quick Start
//!
//! ```rust
//! use gridsync_engine::{value::fields, Change, Replica, Table};
//!
//! let mut alice = Replica::new("alice").unwrap();
//! let mut bob = Replica::new("bob").unwrap();
//!
//! let insert = alice.create_operation("row-1", Change::insert(fields([("qty", 1i64)])), 1000);
//! bob.receive_operation(insert);
//!
//! // Concurrent edits of the same cell
//! let a = alice.create_operation("row-1", Change::update("qty", 2i64), 2000);
//! let b = bob.create_operation("row-1", Change::update("qty", 3i64), 3000);
//! alice.receive_operation(b);
//! bob.receive_operation(a);
//!
//! let left = alice.resolve(&Table::new());
//! let right = bob.resolve(&Table::new());
//! assert_eq!(left, right);
//! assert_eq!(left.conflicts.len(), 1);
//! assert_eq!(left.conflicts[0].winner, "bob-1");
//! ```

pub mod clock;
pub mod error;
pub mod log;
pub mod operation;
pub mod project;
pub mod replica;
pub mod resolve;
pub mod row;
pub mod value;

// Re-export main types at crate root
pub use clock::{CausalOrder, LogicalClock};
pub use error::Error;
pub use log::OperationLog;
pub use operation::{Change, OpKind, Operation, OperationId};
pub use project::{apply_operation, can_apply_operation};
pub use replica::Replica;
pub use resolve::{
    are_concurrent, do_conflict, resolve_conflicts, ConflictRecord, ConflictResolver,
    GroupingStrategy, Resolution, ResolutionStrategy, ResolverOptions,
};
pub use row::{Row, Table};
pub use value::{FieldValue, Fields};

/// Type aliases for clarity
pub type ReplicaId = String;
pub type RowId = String;
pub type FieldId = String;
pub type Version = u64;
pub type Timestamp = u64;
