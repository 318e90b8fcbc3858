//! # Scene Configuration
//!
//! Tunables for a [`Scene`](crate::ecs::Scene), loaded once from TOML.
//!
//! ```toml
//! entity_chunk_size = 128
//! trace_lifecycle = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Configuration of a single scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Number of entity slots added each time the entity store grows.
    pub entity_chunk_size: usize,
    /// Emit a `trace!` event for every entity lifecycle transition.
    pub trace_lifecycle: bool,
}

impl SceneConfig {
    /// Default number of entity slots per growth step.
    pub const DEFAULT_ENTITY_CHUNK_SIZE: usize = 64;

    /// Parses and validates a configuration from TOML text.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the text is not valid TOML,
    /// contains unknown value types, or fails validation.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `entity_chunk_size` is zero.
    pub fn validate(&self) -> EcsResult<()> {
        if self.entity_chunk_size == 0 {
            return Err(EcsError::InvalidConfig(
                "entity_chunk_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            entity_chunk_size: Self::DEFAULT_ENTITY_CHUNK_SIZE,
            trace_lifecycle: false,
        }
    }
}
