//! Annotation sub-parser: `Name`, `Name("x")`, `Name(value = {"a", "b"}, method = GET)`.
//!
//! Fed the tokens following an `@`. Positional arguments are reported with no
//! name and answer to `value`. String concatenation (`"a" + "b"`) is folded
//! into one value; anything that is not a string literal is kept verbatim and
//! flagged as non-literal.

use crate::frameworks::subparser::SubParser;
use crate::tokenizer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgValue {
    pub text: String,
    /// Built only from string literals.
    pub literal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationArg {
    /// `None` for a positional argument.
    pub name: Option<String>,
    pub values: Vec<ArgValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Unqualified name (`RequestMapping` for `org.x.RequestMapping`).
    pub name: String,
    pub line: u32,
    pub args: Vec<AnnotationArg>,
}

impl Annotation {
    /// Values of the first argument named by `keys`; positional arguments
    /// count as `value`.
    pub fn values(&self, keys: &[&str]) -> &[ArgValue] {
        self.args
            .iter()
            .find(|arg| match &arg.name {
                Some(name) => keys.contains(&name.as_str()),
                None => keys.contains(&"value"),
            })
            .map(|arg| arg.values.as_slice())
            .unwrap_or(&[])
    }

    /// First string-literal value under `keys`.
    pub fn literal(&self, keys: &[&str]) -> Option<&str> {
        self.values(keys)
            .iter()
            .find(|v| v.literal)
            .map(|v| v.text.as_str())
    }

    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Name,
    AfterName,
    Args,
    Done,
}

#[derive(Debug)]
pub struct AnnotationParser {
    state: State,
    name: String,
    line: u32,
    args: Vec<AnnotationArg>,
    key: Option<String>,
    values: Vec<ArgValue>,
    pending_word: Option<String>,
    /// Raw text of a nested call expression, e.g. `String.format(`.
    call: Option<String>,
    paren_depth: usize,
    array_depth: usize,
    concat: bool,
    item_ready: bool,
}

impl Default for AnnotationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationParser {
    pub fn new() -> Self {
        Self {
            state: State::Name,
            name: String::new(),
            line: 0,
            args: Vec::new(),
            key: None,
            values: Vec::new(),
            pending_word: None,
            call: None,
            paren_depth: 0,
            array_depth: 0,
            concat: false,
            item_ready: false,
        }
    }

    fn push_value(&mut self, text: &str, literal: bool) {
        if self.concat {
            self.concat = false;
            if let Some(last) = self.values.last_mut() {
                last.text.push_str(text);
                last.literal &= literal;
                return;
            }
        }
        self.values.push(ArgValue {
            text: text.to_string(),
            literal,
        });
    }

    fn flush_word(&mut self) {
        if let Some(word) = self.pending_word.take() {
            self.push_value(&word, false);
        }
    }

    fn finish_arg(&mut self) {
        self.flush_word();
        if self.key.is_some() || !self.values.is_empty() {
            self.args.push(AnnotationArg {
                name: self.key.take(),
                values: std::mem::take(&mut self.values),
            });
        }
    }

    fn finish(&mut self) {
        self.state = State::Done;
        self.item_ready = !self.name.is_empty();
    }

    fn process_arg_token(&mut self, token: &Token) {
        if let Some(call) = self.call.as_mut() {
            call.push_str(&token.source_text());
            match token.punct() {
                Some('(') => self.paren_depth += 1,
                Some(')') => {
                    self.paren_depth -= 1;
                    if self.paren_depth == 1 {
                        if let Some(text) = self.call.take() {
                            self.push_value(&text, false);
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        match &token.kind {
            TokenKind::Quoted { text, .. } => {
                self.flush_word();
                let text = text.clone();
                self.push_value(&text, true);
            }
            TokenKind::Word(w) => {
                self.flush_word();
                self.pending_word = Some(w.clone());
            }
            TokenKind::Punct('=') => {
                if let Some(word) = self.pending_word.take() {
                    self.key = Some(word);
                }
            }
            TokenKind::Punct('+') => {
                self.flush_word();
                self.concat = true;
            }
            TokenKind::Punct('{') => {
                self.flush_word();
                self.array_depth += 1;
            }
            TokenKind::Punct('}') => {
                self.flush_word();
                self.array_depth = self.array_depth.saturating_sub(1);
            }
            TokenKind::Punct(',') => {
                self.flush_word();
                if self.array_depth == 0 {
                    self.finish_arg();
                }
            }
            TokenKind::Punct('(') => {
                let head = self.pending_word.take().unwrap_or_default();
                self.call = Some(format!("{head}("));
                self.paren_depth += 1;
            }
            TokenKind::Punct(')') => {
                self.finish_arg();
                self.finish();
            }
            TokenKind::Punct(_) => {}
            // unterminated: nothing is emitted
            TokenKind::Eof => self.state = State::Done,
        }
    }
}

impl SubParser for AnnotationParser {
    type Item = Annotation;

    fn process_token(&mut self, token: &Token) -> bool {
        match self.state {
            State::Name => match token.word() {
                Some(word) => {
                    self.name = word.rsplit('.').next().unwrap_or(word).to_string();
                    self.line = token.line;
                    self.state = State::AfterName;
                    true
                }
                None => {
                    self.finish();
                    false
                }
            },
            State::AfterName => {
                if token.is_punct('(') {
                    self.paren_depth = 1;
                    self.state = State::Args;
                    true
                } else {
                    self.finish();
                    false
                }
            }
            State::Args => {
                self.process_arg_token(token);
                !token.is_eof()
            }
            State::Done => false,
        }
    }

    fn has_item(&self) -> bool {
        self.item_ready
    }

    fn pull_item(&mut self) -> Option<Annotation> {
        if !self.item_ready {
            return None;
        }
        self.item_ready = false;
        Some(Annotation {
            name: std::mem::take(&mut self.name),
            line: self.line,
            args: std::mem::take(&mut self.args),
        })
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
