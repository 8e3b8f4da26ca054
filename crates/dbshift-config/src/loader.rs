use std::path::Path;

use dbshift_common::{Error, Result};
use tracing::info;

use crate::model::StoreConfig;

/// Reads a `StoreConfig` from YAML or TOML.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a file; the format is chosen by extension.
    pub fn load(path: &Path) -> Result<StoreConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => Self::from_yaml_str(&contents)?,
            "toml" => Self::from_toml_str(&contents)?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("store config loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<StoreConfig> {
        serde_yaml::from_str(contents).map_err(|e| Error::Config(format!("YAML parse error: {e}")))
    }

    pub fn from_toml_str(contents: &str) -> Result<StoreConfig> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
    }
}
