//! Nesting-depth tracker shared by the framework parsers, plus the
//! bracket-matching helpers built on it.

use crate::tokenizer::{Token, TokenKind};

/// Paren/brace/bracket depth plus whether the last token was a string.
///
/// Depths clamp at zero so unbalanced input cannot push them negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeTracker {
    paren: usize,
    brace: usize,
    bracket: usize,
    in_string: bool,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update depths for `token`. Call before any state-specific handling.
    pub fn interpret_token(&mut self, token: &Token) {
        self.in_string = matches!(token.kind, TokenKind::Quoted { .. });
        match token.punct() {
            Some('(') => self.paren += 1,
            Some(')') => self.paren = self.paren.saturating_sub(1),
            Some('{') => self.brace += 1,
            Some('}') => self.brace = self.brace.saturating_sub(1),
            Some('[') => self.bracket += 1,
            Some(']') => self.bracket = self.bracket.saturating_sub(1),
            _ => {}
        }
    }

    pub fn paren_depth(&self) -> usize {
        self.paren
    }

    pub fn brace_depth(&self) -> usize {
        self.brace
    }

    pub fn bracket_depth(&self) -> usize {
        self.bracket
    }

    pub fn is_in_string(&self) -> bool {
        self.in_string
    }

    /// True when no paren, brace or bracket is open.
    pub fn is_top_level(&self) -> bool {
        self.paren == 0 && self.brace == 0 && self.bracket == 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Index of the bracket closing the one at `open`.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut scope = ScopeTracker::new();
    for (i, token) in tokens.iter().enumerate().skip(open) {
        scope.interpret_token(token);
        if i > open && scope.is_top_level() {
            return Some(i);
        }
    }
    None
}

/// Split call arguments (the tokens between the parens) at top-level commas.
pub fn split_args(tokens: &[Token]) -> Vec<&[Token]> {
    let mut args = Vec::new();
    let mut scope = ScopeTracker::new();
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct(',') && scope.is_top_level() {
            args.push(&tokens[start..i]);
            start = i + 1;
            continue;
        }
        scope.interpret_token(token);
    }
    if start < tokens.len() {
        args.push(&tokens[start..]);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, TokenizerOptions};

    fn track(src: &str) -> ScopeTracker {
        let mut scope = ScopeTracker::new();
        for token in Tokenizer::tokenize(src, TokenizerOptions::JAVA) {
            scope.interpret_token(&token);
        }
        scope
    }

    #[test]
    fn test_balanced_is_top_level() {
        assert!(track("void m(int[] a) { if (x) { y[0] = 1; } }").is_top_level());
    }

    #[test]
    fn test_open_depths() {
        let scope = track("class A { void m( ");
        assert_eq!(scope.brace_depth(), 1);
        assert_eq!(scope.paren_depth(), 1);
        assert_eq!(scope.bracket_depth(), 0);
    }

    #[test]
    fn test_clamped_at_zero() {
        let scope = track(") ) } ] (");
        assert_eq!(scope.paren_depth(), 1);
        assert_eq!(scope.brace_depth(), 0);
        assert_eq!(scope.bracket_depth(), 0);
    }

    #[test]
    fn test_in_string_reflects_last_token() {
        let mut scope = ScopeTracker::new();
        let tokens = Tokenizer::tokenize("\"a\" b", TokenizerOptions::JAVA);
        scope.interpret_token(&tokens[0]);
        assert!(scope.is_in_string());
        scope.interpret_token(&tokens[1]);
        assert!(!scope.is_in_string());
    }

    #[test]
    fn test_matching_close_and_split_args() {
        let toks = Tokenizer::tokenize("f(a, (b, c))[0]", TokenizerOptions::JAVA);
        assert_eq!(matching_close(&toks, 1), Some(9));
        assert!(matching_close(&toks[..5], 1).is_none());
        let args = split_args(&toks[2..9]);
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].len(), 5);
    }
}
