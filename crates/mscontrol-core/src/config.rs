//! Configuration for mscontrol-core

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{ControllerError, Result};

/// API version used for recording URIs when no runtime settings were supplied
pub const DEFAULT_API_VERSION: &str = "2012-04-24";

/// Main configuration of a call controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub api_version: String,
    pub recording: RecordingConfig,
}

/// Parameters of the record request issued by `StartRecording`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// DTMF keys that end the recording
    pub finish_on_key: String,
    /// Maximum recording length in seconds
    pub max_length_secs: u32,
    /// Initial silence allowed before the recording gives up, in seconds
    pub timeout_secs: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            recording: RecordingConfig::default(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            finish_on_key: "1234567890*#".to_string(),
            max_length_secs: 3600,
            timeout_secs: 5,
        }
    }
}

impl ControllerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ControllerError::Configuration(format!("Invalid controller config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Per-call runtime settings handed over with recording requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    #[serde(rename = "api-version")]
    pub api_version: String,
}

impl RuntimeSettings {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
        }
    }
}
