use std::path::PathBuf;

/// Failures that abort a whole-directory scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan cancelled")]
    Cancelled,
}
