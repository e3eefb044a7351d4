//! Configuration management for the simulator.

use gridsync_engine::GroupingStrategy;
use std::env;

/// Simulation configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Number of concurrent editing sessions
    pub replicas: usize,
    /// Rows in the shared base table
    pub rows: usize,
    /// Edits performed by each session
    pub edits: usize,
    /// Fraction of deliveries sent twice
    pub duplicate_rate: f64,
    /// Seed for edit selection and delivery jitter
    pub seed: Option<u64>,
    /// Conflict grouping used when resolving
    pub grouping: GroupingStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            replicas: 3,
            rows: 4,
            edits: 20,
            duplicate_rate: 0.2,
            seed: None,
            grouping: GroupingStrategy::Seed,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let replicas = parse_or(&lookup, "SIM_REPLICAS", defaults.replicas)?;
        if replicas == 0 {
            return Err(ConfigError::NoReplicas);
        }

        let rows = parse_or(&lookup, "SIM_ROWS", defaults.rows)?;
        let edits = parse_or(&lookup, "SIM_EDITS", defaults.edits)?;

        let duplicate_rate = parse_or(&lookup, "SIM_DUPLICATE_RATE", defaults.duplicate_rate)?;
        if !(0.0..=1.0).contains(&duplicate_rate) {
            return Err(ConfigError::InvalidRate(duplicate_rate));
        }

        let seed = match lookup("SIM_SEED") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidNumber("SIM_SEED"))?,
            ),
            None => None,
        };

        let grouping = match lookup("SIM_GROUPING").as_deref() {
            None | Some("seed") => GroupingStrategy::Seed,
            Some("closure") => GroupingStrategy::Closure,
            Some(other) => return Err(ConfigError::InvalidGrouping(other.to_string())),
        };

        Ok(Self {
            replicas,
            rows,
            edits,
            duplicate_rate,
            seed,
            grouping,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),

    #[error("SIM_REPLICAS must be at least 1")]
    NoReplicas,

    #[error("SIM_DUPLICATE_RATE must be within 0.0..=1.0, got {0}")]
    InvalidRate(f64),

    #[error("Unknown SIM_GROUPING value: {0} (expected 'seed' or 'closure')")]
    InvalidGrouping(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn reads_all_values() {
        let config = load(&[
            ("SIM_REPLICAS", "5"),
            ("SIM_ROWS", "10"),
            ("SIM_EDITS", "7"),
            ("SIM_DUPLICATE_RATE", "0.5"),
            ("SIM_SEED", "42"),
            ("SIM_GROUPING", "closure"),
        ])
        .unwrap();

        assert_eq!(config.replicas, 5);
        assert_eq!(config.rows, 10);
        assert_eq!(config.edits, 7);
        assert_eq!(config.duplicate_rate, 0.5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.grouping, GroupingStrategy::Closure);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            load(&[("SIM_REPLICAS", "many")]),
            Err(ConfigError::InvalidNumber("SIM_REPLICAS"))
        );
        assert_eq!(load(&[("SIM_REPLICAS", "0")]), Err(ConfigError::NoReplicas));
        assert_eq!(
            load(&[("SIM_DUPLICATE_RATE", "1.5")]),
            Err(ConfigError::InvalidRate(1.5))
        );
        assert!(matches!(
            load(&[("SIM_GROUPING", "clique")]),
            Err(ConfigError::InvalidGrouping(_))
        ));
    }
}
