//! # Rendering Configuration
//!
//! ```toml
//! [store]
//! initial_capacity = 64
//!
//! [bridge]
//! growth_factor = 2
//! min_buffer_size = 256
//!
//! [lighting]
//! direction = [0.5, -1.0, 0.25]
//! color = [1.0, 1.0, 1.0]
//! ambient_strength = 0.2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use prism_core::{ConfigError, ConfigResult, CoreConfig};

/// Buffer sizing policy of the sync bridge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity multiplier applied when a buffer is too small (at least 2).
    pub growth_factor: u64,
    /// Smallest buffer the bridge allocates, in bytes.
    pub min_buffer_size: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            growth_factor: 2,
            min_buffer_size: 256,
        }
    }
}

impl BridgeConfig {
    /// Checks the constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the growth factor is below 2.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.growth_factor < 2 {
            return Err(ConfigError::Invalid(format!(
                "bridge.growth_factor must be at least 2, got {}",
                self.growth_factor
            )));
        }
        Ok(())
    }
}

/// Initial scene lighting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Direction the light travels.
    pub direction: [f32; 3],
    /// Light color, linear RGB.
    pub color: [f32; 3],
    /// Ambient term in `[0, 1]`.
    pub ambient_strength: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            direction: [0.5, -1.0, 0.25],
            color: [1.0, 1.0, 1.0],
            ambient_strength: 0.2,
        }
    }
}

impl LightingConfig {
    /// Checks the constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero direction or an ambient
    /// strength outside `[0, 1]`.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.direction.iter().all(|c| *c == 0.0) {
            return Err(ConfigError::Invalid("lighting.direction must not be zero".into()));
        }
        if !(0.0..=1.0).contains(&self.ambient_strength) {
            return Err(ConfigError::Invalid(format!(
                "lighting.ambient_strength must be within [0, 1], got {}",
                self.ambient_strength
            )));
        }
        Ok(())
    }
}

/// Top-level configuration of the graphics service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Store and scheduler sections.
    #[serde(flatten)]
    pub core: CoreConfig,
    /// Sync bridge sizing.
    pub bridge: BridgeConfig,
    /// Initial lighting.
    pub lighting: LightingConfig,
}

impl RenderingConfig {
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
    /// [`RenderingConfig::from_toml_str`].
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
        self.core.validate()?;
        self.bridge.validate()?;
        self.lighting.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let config = RenderingConfig::from_toml_str(
            r#"
            [store]
            initial_capacity = 8

            [scheduler]
            phases = ["update", "pre-render", "render"]

            [bridge]
            min_buffer_size = 64

            [lighting]
            ambient_strength = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.core.store.initial_capacity, 8);
        assert_eq!(config.bridge.min_buffer_size, 64);
        assert_eq!(config.bridge.growth_factor, 2);
        assert!((config.lighting.ambient_strength - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(RenderingConfig::from_toml_str("").unwrap(), RenderingConfig::default());
    }

    #[test]
    fn test_rejects_bad_bridge_growth() {
        let err = RenderingConfig::from_toml_str("[bridge]\ngrowth_factor = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_ambient() {
        let err = RenderingConfig::from_toml_str("[lighting]\nambient_strength = 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
