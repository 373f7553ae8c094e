//! Token cache: Moka in-memory, keyed by content hash.
//! Same content and options always tokenize the same way.

use std::sync::Arc;

use moka::sync::Cache;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use super::{Token, Tokenizer, TokenizerOptions};

/// In-memory token cache (TinyLFU admission).
pub struct TokenCache {
    inner: Cache<u64, Arc<[Token]>>,
}

impl TokenCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    /// Tokens for `source`, tokenizing on a miss.
    pub fn tokens(&self, source: &str, options: TokenizerOptions) -> Arc<[Token]> {
        let key = cache_key(source, options);
        self.inner
            .get_with(key, || Tokenizer::tokenize(source, options).into())
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(4_096)
    }
}

fn cache_key(source: &str, options: TokenizerOptions) -> u64 {
    xxh3_64_with_seed(source.as_bytes(), options.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_allocation() {
        let cache = TokenCache::default();
        let a = cache.tokens("def view(request): pass", TokenizerOptions::PYTHON);
        let b = cache.tokens("def view(request): pass", TokenizerOptions::PYTHON);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_options_are_part_of_key() {
        let cache = TokenCache::default();
        let py = cache.tokens("# x", TokenizerOptions::PYTHON);
        let java = cache.tokens("# x", TokenizerOptions::JAVA);
        assert_eq!(py.len(), 1);
        assert_eq!(java.len(), 3);
    }
}
