//! Graft configuration
//!
//! ```toml
//! material_order = "definition"   # or "first_seen"
//! max_messages_per_pump = 64      # 0 = drain everything
//! notify_originator = true
//! ```

use crate::correlation::MaterialOrder;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Graft configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraftConfig {
    /// Order of materials in the model's material list
    pub material_order: MaterialOrder,
    /// Inbound messages handled per endpoint per pump; 0 means unbounded
    pub max_messages_per_pump: usize,
    /// Whether the endpoint that sent a request also receives its notification
    pub notify_originator: bool,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            material_order: MaterialOrder::Definition,
            max_messages_per_pump: 0,
            notify_originator: true,
        }
    }
}

impl GraftConfig {
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
    fn test_parse_partial_config() {
        let config = GraftConfig::from_toml_str(r#"material_order = "first_seen""#).unwrap();
        assert_eq!(config.material_order, MaterialOrder::FirstSeen);
        assert_eq!(config.max_messages_per_pump, 0);
        assert!(config.notify_originator);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(GraftConfig::from_toml_str("").unwrap(), GraftConfig::default());
    }

    #[test]
    fn test_invalid_order_rejected() {
        let err = GraftConfig::from_toml_str(r#"material_order = "random""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
