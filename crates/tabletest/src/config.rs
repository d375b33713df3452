//! Comparison configuration.

use serde::{Deserialize, Serialize};

use crate::arbitrary::SeedPolicy;
use crate::error::ConfigError;
use crate::tolerance::Tolerance;

/// Trials per functional-equivalence check.
pub const DEFAULT_TRIALS: u32 = 1000;

/// Environment variable overriding [`CompareConfig::tolerance`].
pub const ENV_TOLERANCE: &str = "TABLETEST_TOLERANCE";
/// Environment variable overriding [`CompareConfig::seed`] (`time` or an integer).
pub const ENV_SEED: &str = "TABLETEST_SEED";
/// Environment variable overriding [`CompareConfig::trials`].
pub const ENV_TRIALS: &str = "TABLETEST_TRIALS";

/// Settings for one [`Comparator`](crate::Comparator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Numeric tolerance. Zero means exact.
    pub tolerance: Tolerance,
    /// Seed source for functional-equivalence checks.
    pub seed: SeedPolicy,
    /// Argument tuples tried per functional-equivalence check.
    pub trials: u32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::EXACT,
            seed: SeedPolicy::default(),
            trials: DEFAULT_TRIALS,
        }
    }
}

impl CompareConfig {
    pub fn new(tolerance: impl Into<Tolerance>) -> Self {
        Self {
            tolerance: tolerance.into(),
            ..Self::default()
        }
    }

    /// Defaults with `TABLETEST_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, such as the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TOLERANCE) {
            let parsed: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                key: ENV_TOLERANCE,
                value: raw.clone(),
            })?;
            self.tolerance = Tolerance::new(parsed);
        }
        if let Some(raw) = lookup(ENV_SEED) {
            self.seed = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_TRIALS) {
            self.trials = raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                key: ENV_TRIALS,
                value: raw.clone(),
            })?;
        }
        Ok(self)
    }

    pub fn with_tolerance(mut self, tolerance: impl Into<Tolerance>) -> Self {
        self.tolerance = tolerance.into();
        self
    }

    pub fn with_seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }
}
