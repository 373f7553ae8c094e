//! Contract for the small state machines framework parsers delegate
//! compound sub-grammars to (argument lists, attribute arguments).

use crate::tokenizer::Token;

/// A token-at-a-time parser that yields complete items only.
///
/// The owner feeds tokens and, after every call, checks `has_item`. An item is
/// never exposed half-built: `pull_item` returns `None` until one is complete.
pub trait SubParser {
    type Item;

    /// Feed one token. Returns `false` when the token was not consumed; the
    /// owner must then handle it itself.
    fn process_token(&mut self, token: &Token) -> bool;

    fn has_item(&self) -> bool;

    /// Take the completed item, if any.
    fn pull_item(&mut self) -> Option<Self::Item>;

    /// Discard partial state and start over.
    fn reset(&mut self);
}
