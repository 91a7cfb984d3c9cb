//! Configuration for the transient event store.
//!
//! Settings are loaded from a TOML file whose keys match the platform's
//! property names (quoted, since they contain dots):
//!
//! ```toml
//! "transient.data.store" = "/var/tmp/reactive"
//! "running.in.cloud" = false
//! ```
//!
//! All fields have defaults suitable for local use.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;

/// Settings for the holding area and the shared store inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory under which holding areas are created.
    #[serde(rename = "transient.data.store", default = "default_data_store")]
    pub data_store: PathBuf,

    /// When true the holding area is the root itself rather than a
    /// per-instance subdirectory, so it can be shared across restarts.
    #[serde(rename = "running.in.cloud", default)]
    pub running_in_cloud: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_store: default_data_store(),
            running_in_cloud: false,
        }
    }
}

fn default_data_store() -> PathBuf {
    PathBuf::from(constants::DEFAULT_DATA_STORE)
}

impl StoreConfig {
    /// Load configuration from the specified TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: StoreConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_empty() -> Result<()> {
        let config: StoreConfig = toml::from_str("")?;
        assert_eq!(config.data_store, PathBuf::from("/tmp/reactive"));
        assert!(!config.running_in_cloud);
        Ok(())
    }

    #[test]
    fn dotted_keys_are_recognized() -> Result<()> {
        let config: StoreConfig = toml::from_str(
            r#"
            "transient.data.store" = "/var/tmp/events"
            "running.in.cloud" = true
            "#,
        )?;
        assert_eq!(config.data_store, PathBuf::from("/var/tmp/events"));
        assert!(config.running_in_cloud);
        Ok(())
    }

    #[test]
    fn load_from_reports_the_offending_path() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("store.toml");
        fs::write(&path, "\"running.in.cloud\" = \"not a bool\"")?;

        let err = StoreConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("store.toml"));
        Ok(())
    }
}
