//! Bridge configuration loading

use std::path::{Path, PathBuf};

use purifier_api::DeviceConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SdkError;

/// The set of purifiers a bridge manages
///
/// ```json
/// {
///   "devices": [
///     {
///       "address": "192.168.1.40",
///       "token": "00112233445566778899aabbccddeeff",
///       "model": "zhimi.airpurifier.m1",
///       "name": "Bedroom"
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SdkError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading bridge configuration");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// `<config dir>/purifier-sdk/devices.json`
    pub fn default_path() -> Result<PathBuf, SdkError> {
        dirs::config_dir()
            .map(|dir| dir.join("purifier-sdk").join("devices.json"))
            .ok_or(SdkError::NoConfigDir)
    }

    /// Load from [`BridgeConfig::default_path`]
    pub fn load_default() -> Result<Self, SdkError> {
        Self::from_path(Self::default_path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purifier_api::Model;

    #[test]
    fn test_parse_bridge_config() {
        let config = BridgeConfig::from_json_str(
            r#"{
                "devices": [
                    {
                        "address": "192.168.1.40",
                        "token": "00112233445566778899aabbccddeeff",
                        "model": "zhimi.airpurifier.m1",
                        "name": "Bedroom",
                        "features": { "childLock": false }
                    },
                    {
                        "address": "192.168.1.41:54321",
                        "token": "ffeeddccbbaa99887766554433221100",
                        "model": "zhimi.airpurifier.v6",
                        "name": "Hall"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].model, Model::M1);
        assert!(!config.devices[0].features.child_lock);
        assert!(config.devices[1].features.child_lock);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            BridgeConfig::from_json_str("{ devices: "),
            Err(SdkError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            BridgeConfig::from_path("/nonexistent/purifier/devices.json"),
            Err(SdkError::Io(_))
        ));
    }
}
