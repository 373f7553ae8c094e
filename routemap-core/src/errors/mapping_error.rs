use std::path::PathBuf;

/// Failures loading an externally supplied entity-mapping table.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read entity mappings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON entity mappings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML entity mappings: {0}")]
    Toml(#[from] toml::de::Error),
}
