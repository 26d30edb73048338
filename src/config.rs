use crate::abstraction::{DEFAULT_BUCKETS, DEFAULT_SAMPLES};
use crate::cfr::CfrVariant;
use crate::equity::DEFAULT_TRIALS;
use crate::error::ConfigError;
use crate::recommend::DEFAULT_FREQUENCY_CUTOFF;
use crate::solver::{SolverConfig, DEFAULT_CHECK_EVERY, DEFAULT_ITERATIONS, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// CFR iterations when the request names none.
    pub iterations: usize,
    /// Exploitability, as a fraction of the pot, at which the solver stops.
    pub exploitability_threshold: f64,
    /// Monte Carlo trials when the request names none.
    pub trials: usize,
    pub max_iterations: usize,
    pub max_trials: usize,
    /// Hand-strength buckets per player.
    pub buckets: usize,
    /// Sampled deals used to build the hand abstraction.
    pub abstraction_samples: usize,
    pub check_every: usize,
    /// Recommendations below this frequency are hidden.
    pub frequency_cutoff: f64,
    pub variant: CfrVariant,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            exploitability_threshold: DEFAULT_THRESHOLD,
            trials: DEFAULT_TRIALS,
            max_iterations: 20_000,
            max_trials: 200_000,
            buckets: DEFAULT_BUCKETS,
            abstraction_samples: DEFAULT_SAMPLES,
            check_every: DEFAULT_CHECK_EVERY,
            frequency_cutoff: DEFAULT_FREQUENCY_CUTOFF,
            variant: CfrVariant::Plus,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("iterations", self.iterations),
            ("trials", self.trials),
            ("max_iterations", self.max_iterations),
            ("max_trials", self.max_trials),
            ("buckets", self.buckets),
            ("abstraction_samples", self.abstraction_samples),
            ("check_every", self.check_every),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.iterations > self.max_iterations {
            return Err(ConfigError::Invalid(format!(
                "iterations ({}) exceed max_iterations ({})",
                self.iterations, self.max_iterations
            )));
        }
        if self.trials > self.max_trials {
            return Err(ConfigError::Invalid(format!(
                "trials ({}) exceed max_trials ({})",
                self.trials, self.max_trials
            )));
        }
        if self.buckets > 64 {
            return Err(ConfigError::Invalid(format!(
                "at most 64 buckets are supported, found {}",
                self.buckets
            )));
        }
        if !(self.exploitability_threshold >= 0.0) {
            return Err(ConfigError::Invalid(
                "exploitability_threshold must be non-negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.frequency_cutoff) {
            return Err(ConfigError::Invalid(
                "frequency_cutoff must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            buckets: self.buckets,
            abstraction_samples: self.abstraction_samples,
            check_every: self.check_every,
            variant: self.variant,
        }
    }
}
