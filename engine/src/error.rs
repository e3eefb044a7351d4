//! Error types for the gridsync engine.
//!
//! Resolution and projection never fail; errors only arise when constructing
//! a replica or encoding values at the transport and renderer boundaries.

use crate::ReplicaId;
use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid replica id: {0:?}")]
    InvalidReplicaId(ReplicaId),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
