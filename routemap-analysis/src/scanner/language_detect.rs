//! Language detection from file extension.

use serde::{Deserialize, Serialize};

/// Source languages the framework parsers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Java,
    CSharp,
    Python,
    Ruby,
}

impl Language {
    /// Detect language from a file extension string.
    pub fn from_extension(ext: Option<&str>) -> Option<Language> {
        match ext? {
            "java" => Some(Language::Java),
            "cs" => Some(Language::CSharp),
            "py" => Some(Language::Python),
            "rb" | "rake" => Some(Language::Ruby),
            _ => None,
        }
    }

    /// Returns all file extensions associated with this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::CSharp => &["cs"],
            Language::Python => &["py"],
            Language::Ruby => &["rb", "rake"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::Python => "Python",
            Language::Ruby => "Ruby",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension(Some("java")), Some(Language::Java));
        assert_eq!(Language::from_extension(Some("rake")), Some(Language::Ruby));
        assert_eq!(Language::from_extension(Some("ts")), None);
        assert_eq!(Language::from_extension(None), None);
    }

    #[test]
    fn test_extensions_roundtrip() {
        for lang in [Language::Java, Language::CSharp, Language::Python, Language::Ruby] {
            for ext in lang.extensions() {
                assert_eq!(Language::from_extension(Some(ext)), Some(lang));
            }
        }
    }
}
