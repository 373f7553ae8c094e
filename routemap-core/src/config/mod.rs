//! Configuration loaded from `routemap.toml` at the scan root.
//!
//! Every field is optional; a missing file yields the defaults.

mod extraction_config;
mod scan_config;

pub use extraction_config::ExtractionConfig;
pub use scan_config::ScanConfig;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "routemap.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutemapConfig {
    pub scan: ScanConfig,
    pub extraction: ExtractionConfig,
}

impl RoutemapConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load `routemap.toml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Framework;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = RoutemapConfig::from_toml("").unwrap();
        assert_eq!(config.scan.effective_max_file_size(), 1_048_576);
        assert!(config.extraction.frameworks.is_none());
        assert!(config.extraction.expand_models);
    }

    #[test]
    fn test_partial_toml() {
        let config = RoutemapConfig::from_toml(
            r#"
            [scan]
            threads = 2
            extra_ignore = ["generated"]

            [extraction]
            frameworks = ["spring", "rails"]
            max_model_depth = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.effective_threads(), 2);
        assert_eq!(config.scan.extra_ignore, vec!["generated".to_string()]);
        assert_eq!(
            config.extraction.frameworks,
            Some(vec![Framework::Spring, Framework::Rails])
        );
        assert_eq!(config.extraction.max_model_depth, 2);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(RoutemapConfig::from_toml("[scan\nthreads = ").is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = RoutemapConfig::load(dir.path()).unwrap();
        assert!(config.scan.extra_ignore.is_empty());
    }

    #[test]
    fn test_load_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[extraction]\nexpand_models = false\n",
        )
        .unwrap();
        let config = RoutemapConfig::load(dir.path()).unwrap();
        assert!(!config.extraction.expand_models);
    }
}
