//! Configuration for reaction programs and replicate ensembles.
//!
//! ## Example `reactions.toml`
//!
//! ```toml
//! [engine]
//! seed = 42
//! refresh_external_on_entry = true
//!
//! [ensemble]
//! replicates = 16
//! threads = 4
//! time_step = 0.1
//! steps = 100
//!
//! [parameters]
//! k_on = 0.5
//! ```
//!
//! Missing tables and fields fall back to their `Default` values.

use crate::context::Parameters;
use crate::error::{ReactionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behaviour of a single agent's reaction program.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Base seed for agent-local generators; `None` draws from system entropy.
    pub seed: Option<u64>,
    /// Recompute environment- and parameter-dependent propensities at the
    /// start of every call.
    pub refresh_external_on_entry: bool,
}

/// Independent replicate trajectories run in parallel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnsembleConfig {
    pub replicates: usize,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    pub seed: Option<u64>,
    /// Simulated time per tick.
    pub time_step: f64,
    /// Ticks per replicate.
    pub steps: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            replicates: 1,
            threads: None,
            seed: None,
            time_step: 1.0,
            steps: 1,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.replicates == 0 {
            return Err(ReactionError::Config(
                "number of replicates must be greater than zero".into(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ReactionError::Config(
                "thread count must be greater than zero".into(),
            ));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ReactionError::Config(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub engine: EngineConfig,
    pub ensemble: EnsembleConfig,
    pub parameters: Parameters,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.ensemble.validate()?;
        if let Some((name, value)) = self.parameters.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ReactionError::Config(format!(
                "parameter '{name}' must be finite, got {value}"
            )));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}
