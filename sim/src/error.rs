//! Unified error handling for the simulator.

use crate::config::ConfigError;

/// Simulator error type.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] gridsync_engine::Error),

    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the simulator.
pub type Result<T> = std::result::Result<T, SimError>;
