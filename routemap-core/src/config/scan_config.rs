use serde::{Deserialize, Serialize};

const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// File-walking options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Files larger than this are skipped. Defaults to 1 MiB.
    pub max_file_size: Option<u64>,
    /// Walker/extraction threads. 0 or unset lets the pools decide.
    pub threads: Option<usize>,
    pub follow_symlinks: Option<bool>,
    /// Extra gitignore-style patterns to exclude.
    pub extra_ignore: Vec<String>,
}

impl ScanConfig {
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(0)
    }
}
