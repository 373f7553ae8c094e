use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Framework;

/// Endpoint extraction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Frameworks to extract. `None` auto-detects from the file tree.
    pub frameworks: Option<Vec<Framework>>,
    /// Flatten bound-model parameters through entity mappings.
    pub expand_models: bool,
    /// Nesting bound for bound-model flattening.
    pub max_model_depth: usize,
    /// JSON or TOML entity-mapping table, relative to the scan root.
    pub entity_mappings: Option<PathBuf>,
    /// Derive entity mappings from Java bean classes in the tree.
    pub scan_java_entities: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            frameworks: None,
            expand_models: true,
            max_model_depth: 4,
            entity_mappings: None,
            scan_java_entities: true,
        }
    }
}
