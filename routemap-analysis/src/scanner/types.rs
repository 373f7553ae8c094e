//! Scanner types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::language_detect::Language;

/// A source file picked up by the walker or supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute (or caller-supplied) path.
    pub path: PathBuf,
    /// Path relative to the scan root, always `/`-separated.
    pub relative_path: String,
    pub language: Language,
    pub file_size: u64,
}

impl SourceFile {
    /// Build from a path under `root`. Returns `None` for unsupported languages.
    pub fn new(root: &Path, path: &Path, file_size: u64) -> Option<Self> {
        let language = Language::from_extension(path.extension().and_then(|e| e.to_str()))?;
        Some(Self {
            path: path.to_path_buf(),
            relative_path: relative_path(root, path),
            language,
            file_size,
        })
    }

    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Relative path of the containing directory (`""` at the root).
    pub fn relative_dir(&self) -> &str {
        match self.relative_path.rfind('/') {
            Some(idx) => &self.relative_path[..idx],
            None => "",
        }
    }
}

/// `path` relative to `root` with `/` separators; `path` itself if outside `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_and_dir() {
        let root = Path::new("/app");
        let file = SourceFile::new(root, Path::new("/app/blog/views.py"), 10).unwrap();
        assert_eq!(file.relative_path, "blog/views.py");
        assert_eq!(file.file_name(), "views.py");
        assert_eq!(file.relative_dir(), "blog");
        assert_eq!(file.language, Language::Python);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(SourceFile::new(Path::new("/app"), Path::new("/app/README.md"), 1).is_none());
    }
}
