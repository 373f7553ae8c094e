//! Drives a tokenizer over a source and feeds each token to a consumer.
//!
//! After every token the consumer is asked whether to continue; a `false`
//! answer stops the run cleanly. Tokens are never reordered or split.

use std::path::Path;

use routemap_core::errors::ExtractError;

use super::{Token, Tokenizer, TokenizerOptions};

/// Receives tokens in file order.
pub trait TokenConsumer {
    fn process_token(&mut self, token: &Token);

    /// Checked after each token. Returning false stops the run early.
    fn should_continue(&self) -> bool {
        true
    }
}

/// Run `consumer` over a source string.
pub fn run_source<C: TokenConsumer + ?Sized>(
    source: &str,
    options: TokenizerOptions,
    consumer: &mut C,
) {
    for token in Tokenizer::new(source, options) {
        consumer.process_token(&token);
        if !consumer.should_continue() {
            break;
        }
    }
}

/// Run `consumer` over an already tokenized stream.
pub fn run_tokens<C: TokenConsumer + ?Sized>(tokens: &[Token], consumer: &mut C) {
    for token in tokens {
        consumer.process_token(token);
        if !consumer.should_continue() {
            break;
        }
    }
}

/// Read `path` and run `consumer` over it. Only I/O can fail.
pub fn run_file<C: TokenConsumer + ?Sized>(
    path: &Path,
    options: TokenizerOptions,
    consumer: &mut C,
) -> Result<(), ExtractError> {
    let source = read_source(path)?;
    run_source(&source, options, consumer);
    Ok(())
}

/// Read a source file, replacing invalid UTF-8 rather than failing.
pub fn read_source(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        seen: Vec<Token>,
        limit: Option<usize>,
    }

    impl TokenConsumer for Collect {
        fn process_token(&mut self, token: &Token) {
            self.seen.push(token.clone());
        }

        fn should_continue(&self) -> bool {
            self.limit.map_or(true, |l| self.seen.len() < l)
        }
    }

    #[test]
    fn test_run_delivers_eof_last() {
        let mut consumer = Collect::default();
        run_source("a b", TokenizerOptions::JAVA, &mut consumer);
        assert_eq!(consumer.seen.len(), 3);
        assert!(consumer.seen[2].is_eof());
    }

    #[test]
    fn test_early_stop() {
        let mut consumer = Collect {
            limit: Some(2),
            ..Default::default()
        };
        run_source("a b c d e", TokenizerOptions::JAVA, &mut consumer);
        assert_eq!(consumer.seen.len(), 2);
        assert!(consumer.seen[1].is_word("b"));
    }

    #[test]
    fn test_run_tokens_matches_run_source() {
        let src = "class A { void m() {} }";
        let mut a = Collect::default();
        run_source(src, TokenizerOptions::JAVA, &mut a);
        let mut b = Collect::default();
        run_tokens(&Tokenizer::tokenize(src, TokenizerOptions::JAVA), &mut b);
        assert_eq!(a.seen, b.seen);
    }

    #[test]
    fn test_run_file_missing_is_io_error() {
        let mut consumer = Collect::default();
        let err = run_file(Path::new("/definitely/not/here.java"), TokenizerOptions::JAVA, &mut consumer)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
        assert!(consumer.seen.is_empty());
    }

    #[test]
    fn test_read_source_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.py");
        std::fs::write(&path, b"def f():\n  x = '\xff'\n").unwrap();
        let source = read_source(&path).unwrap();
        assert!(source.starts_with("def f()"));
    }
}
