//! Engine configuration.
//!
//! Every field has a default, so an empty TOML file is a valid configuration:
//!
//! ```toml
//! sample_rate = 44100
//! block_size = 256
//! history_depth = 100
//! require_user_gesture = true
//! ```

use std::path::Path;

use patchwire_host::ContextOptions;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime settings for a [`GraphSynchronizer`](crate::GraphSynchronizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate of every fresh context, in Hz.
    pub sample_rate: u32,
    /// Frames per rendered block.
    pub block_size: usize,
    /// Number of patch sets kept on the undo stack.
    pub history_depth: usize,
    /// Maximum hop count of one control fan-out.
    pub max_propagation_depth: usize,
    /// Start contexts suspended; triggers are deferred until resume.
    pub require_user_gesture: bool,
    /// Seed for generated noise buffers.
    pub noise_seed: u32,
    /// Autostart used when a startable unit declares no `autostart` property.
    pub default_autostart: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 128,
            history_depth: 50,
            max_propagation_depth: 64,
            require_user_gesture: false,
            noise_seed: 0x5EED,
            default_autostart: true,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("config_load: {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(ConfigError::invalid(
                "sample_rate",
                format!("{} is outside 8000..=384000", self.sample_rate),
            ));
        }
        if self.block_size == 0 || self.block_size > 8192 {
            return Err(ConfigError::invalid(
                "block_size",
                format!("{} is outside 1..=8192", self.block_size),
            ));
        }
        if self.history_depth == 0 {
            return Err(ConfigError::invalid("history_depth", "must be at least 1"));
        }
        if self.max_propagation_depth == 0 {
            return Err(ConfigError::invalid(
                "max_propagation_depth",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Options for a fresh host context.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            sample_rate: self.sample_rate as f32,
            block_size: self.block_size,
            start_suspended: self.require_user_gesture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config =
            EngineConfig::from_toml_str("block_size = 64\nrequire_user_gesture = true").unwrap();
        assert_eq!(config.block_size, 64);
        assert!(config.require_user_gesture);
        assert_eq!(config.history_depth, 50);
        assert!(config.context_options().start_suspended);
    }

    #[test]
    fn rejects_zero_block_size() {
        let err = EngineConfig::from_toml_str("block_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "block_size", .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("sample_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample_rate = 44100").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.sample_rate, 44100);
    }

    #[test]
    fn load_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn toml_round_trip() {
        let config = EngineConfig {
            noise_seed: 99,
            ..EngineConfig::default()
        };
        let back = EngineConfig::from_toml_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
