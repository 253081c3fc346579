//! # Core Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! [store]
//! initial_capacity = 64
//! growth_factor = 2
//!
//! [scheduler]
//! phases = ["update", "pre-render", "render"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::MAX_GROWTH_FACTOR;
use crate::error::{ConfigError, ConfigResult};

/// Phases used when no configuration overrides them.
pub const DEFAULT_PHASES: [&str; 3] = ["update", "pre-render", "render"];

/// Largest `store.initial_capacity` accepted, in rows per column.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Column sizing policy for every table the store creates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Records pre-allocated per column when a table is created.
    pub initial_capacity: usize,
    /// Capacity multiplier applied when a column is full (2 to 16).
    pub growth_factor: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            growth_factor: 2,
        }
    }
}

impl StoreConfig {
    /// Checks the constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the growth factor is outside
    /// `2..=MAX_GROWTH_FACTOR` or the initial capacity exceeds
    /// [`MAX_INITIAL_CAPACITY`].
    pub fn validate(&self) -> ConfigResult<()> {
        if !(2..=MAX_GROWTH_FACTOR).contains(&self.growth_factor) {
            return Err(ConfigError::Invalid(format!(
                "store.growth_factor must be between 2 and {MAX_GROWTH_FACTOR}, got {}",
                self.growth_factor
            )));
        }
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "store.initial_capacity must be at most {MAX_INITIAL_CAPACITY}, got {}",
                self.initial_capacity
            )));
        }
        Ok(())
    }
}

/// Ordered phase list for the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Phase names in execution order.
    pub phases: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            phases: DEFAULT_PHASES.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl SchedulerConfig {
    /// Checks the constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the phase list is empty or repeats a name.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.phases.is_empty() {
            return Err(ConfigError::Invalid("scheduler.phases must not be empty".into()));
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if self.phases[..i].contains(phase) {
                return Err(ConfigError::Invalid(format!(
                    "scheduler.phases lists `{phase}` twice"
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration for the core crate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Store sizing.
    pub store: StoreConfig,
    /// Scheduler phases.
    pub scheduler: SchedulerConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed TOML and [`ConfigError::Invalid`]
    /// for out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`CoreConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error.
    pub fn validate(&self) -> ConfigResult<()> {
        self.store.validate()?;
        self.scheduler.validate()
    }
}
