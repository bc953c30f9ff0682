//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest display name a player can build by receiving characters
pub const DEFAULT_MAX_NAME_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Received characters are only appended to a display name while it stays
    /// within this many characters
    pub max_name_length: usize,
    /// Whether trade workflows record entries in the activity log
    pub record_activity: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            record_activity: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_name_length".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(r#"{"record_activity": false}"#).unwrap();
        assert_eq!(config.max_name_length, DEFAULT_MAX_NAME_LENGTH);
        assert!(!config.record_activity);
    }

    #[test]
    fn test_zero_name_length_rejected() {
        let result = EngineConfig::from_json_str(r#"{"max_name_length": 0}"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
