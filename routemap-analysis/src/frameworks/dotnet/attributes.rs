//! Attribute sub-parser: `[Route("x")]`, `[HttpGet, Authorize(Roles = "a")]`.
//!
//! Fed tokens from the opening `[`. Every attribute of the section becomes one
//! item; arguments are read with the shared [`ParameterListParser`].

use std::collections::VecDeque;

use super::parameters::{DotNetParameter, ParameterListParser};
use super::syntax::attribute_name;
use crate::frameworks::subparser::SubParser;
use crate::scope::ScopeTracker;
use crate::tokenizer::Token;

/// Attribute targets that may prefix a section (`[return: X]`).
const TARGETS: &[&str] = &["assembly", "module", "return", "method", "param", "type", "field", "property", "event"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Unqualified name without the `Attribute` suffix.
    pub name: String,
    pub line: u32,
    pub args: Vec<DotNetParameter>,
}

impl Attribute {
    /// Unnamed arguments in order.
    pub fn positional(&self) -> impl Iterator<Item = &DotNetParameter> {
        self.args.iter().filter(|a| a.name.is_none())
    }

    /// String literal of the first positional argument.
    pub fn first_literal(&self) -> Option<&str> {
        self.positional().next().and_then(DotNetParameter::literal)
    }

    /// Literal value of `Name = "x"` or `name: "x"`, matched case-insensitively.
    pub fn named(&self, key: &str) -> Option<&str> {
        self.named_arg(key).and_then(DotNetParameter::literal)
    }

    pub fn named_arg(&self, key: &str) -> Option<&DotNetParameter> {
        self.args
            .iter()
            .find(|a| a.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(key)))
    }

    /// Verbatim text of every argument value, positional or named.
    pub fn raw_values(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .filter_map(|a| a.value.as_deref().or(a.default_value.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for `[`.
    Search,
    /// Expecting an attribute name (or a target prefix).
    Name,
    /// After the name: `(`, `,` or `]`.
    AfterName,
    /// Inside `(...)`.
    Args,
    /// Skipping a generic argument list `<...>`.
    Generic { depth: usize },
}

#[derive(Debug)]
pub struct AttributeParser {
    state: State,
    scope: ScopeTracker,
    current: Option<Attribute>,
    args: ParameterListParser,
    ready: VecDeque<Attribute>,
    closed: bool,
}

impl Default for AttributeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeParser {
    pub fn new() -> Self {
        Self {
            state: State::Search,
            scope: ScopeTracker::new(),
            current: None,
            args: ParameterListParser::new(),
            ready: VecDeque::new(),
            closed: false,
        }
    }

    /// True once the section's closing `]` was consumed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Inside a `[...]` section.
    pub fn is_building(&self) -> bool {
        self.state != State::Search
    }

    fn finish_current(&mut self) {
        if let Some(attribute) = self.current.take() {
            self.ready.push_back(attribute);
        }
    }

    fn end_section(&mut self) {
        self.finish_current();
        self.state = State::Search;
        self.closed = true;
    }
}

impl SubParser for AttributeParser {
    type Item = Attribute;

    fn process_token(&mut self, token: &Token) -> bool {
        if token.is_eof() {
            return false;
        }
        self.scope.interpret_token(token);
        match self.state {
            State::Search => {
                if token.is_punct('[') {
                    self.state = State::Name;
                    self.closed = false;
                    return true;
                }
                false
            }
            State::Name => {
                if let Some(word) = token.word() {
                    if TARGETS.contains(&word) {
                        return true;
                    }
                    self.current = Some(Attribute {
                        name: attribute_name(word).to_string(),
                        line: token.line,
                        args: Vec::new(),
                    });
                    self.state = State::AfterName;
                } else if token.is_punct(']') && self.scope.bracket_depth() == 0 {
                    self.end_section();
                }
                true
            }
            State::AfterName => {
                match token.punct() {
                    Some('(') => {
                        self.args.reset();
                        self.args.process_token(token);
                        self.state = State::Args;
                    }
                    Some('<') => self.state = State::Generic { depth: 1 },
                    Some(',') => {
                        self.finish_current();
                        self.state = State::Name;
                    }
                    Some(']') if self.scope.bracket_depth() == 0 => self.end_section(),
                    _ => {}
                }
                true
            }
            State::Generic { depth } => {
                self.state = match token.punct() {
                    Some('<') => State::Generic { depth: depth + 1 },
                    Some('>') if depth == 1 => State::AfterName,
                    Some('>') => State::Generic { depth: depth - 1 },
                    _ => State::Generic { depth },
                };
                true
            }
            State::Args => {
                self.args.process_token(token);
                while let Some(arg) = self.args.pull_item() {
                    if let Some(current) = self.current.as_mut() {
                        current.args.push(arg);
                    }
                }
                if self.args.is_closed() {
                    self.state = State::AfterName;
                }
                true
            }
        }
    }

    fn has_item(&self) -> bool {
        !self.ready.is_empty()
    }

    fn pull_item(&mut self) -> Option<Attribute> {
        self.ready.pop_front()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
