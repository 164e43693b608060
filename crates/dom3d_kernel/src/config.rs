//! Kernel configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Inbound messages handled per pump; 0 means unbounded
    pub max_messages_per_pump: usize,
    /// Reject disallowed properties and malformed values without a round trip
    pub validate_locally: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_messages_per_pump: 0,
            validate_locally: true,
        }
    }
}

impl KernelConfig {
    /// Parse from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = KernelConfig::from_toml_str(
            "max_messages_per_pump = 16\nvalidate_locally = false\n",
        )
        .unwrap();
        assert_eq!(config.max_messages_per_pump, 16);
        assert!(!config.validate_locally);
        assert_eq!(KernelConfig::from_toml_str("").unwrap(), KernelConfig::default());
    }
}
