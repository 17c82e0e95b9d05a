//! Solver configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid solver configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read solver configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Knobs of a solver run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Acyclic terms with an occurs check; otherwise rational trees.
    pub finite: bool,
    /// Stop at the first failed constraint with an error message.
    pub return_on_first_error: bool,
    /// Upper bound on solver steps per run.
    pub max_steps: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            finite: true,
            return_on_first_error: false,
            max_steps: None,
        }
    }
}

impl SolverConfig {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
