//! Parenthesised argument-list sub-parser, shared by method signatures and
//! attribute arguments.
//!
//! Four states: `Search` waits for the opening `(`; `ParameterStart` builds a
//! declaration (`Type name`), a named argument (`name: value`), a defaulted
//! parameter (`Type name = value`) or a bare positional value; `DefaultValue`
//! and `ExplicitValue` copy an expression verbatim up to the next top-level
//! `,` or the closing `)`.

use std::collections::VecDeque;

use super::attributes::{Attribute, AttributeParser};
use super::syntax::{is_partial_type_name, is_valid_identifier, is_valid_type_name, PARAMETER_MODIFIERS};
use crate::frameworks::subparser::SubParser;
use crate::scope::ScopeTracker;
use crate::tokenizer::{Token, TokenKind};

/// One entry of an argument list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotNetParameter {
    pub index: usize,
    pub name: Option<String>,
    pub type_name: Option<String>,
    /// Verbatim default expression (`= value`).
    pub default_value: Option<String>,
    /// Verbatim positional value or named-argument value (`name: value`).
    pub value: Option<String>,
    pub attributes: Vec<Attribute>,
    /// First parameter of an extension method (`this Type x`).
    pub is_extension: bool,
}

impl DotNetParameter {
    fn has_data(&self) -> bool {
        self.type_name.is_some()
            || self.name.is_some()
            || self.default_value.is_some()
            || self.value.is_some()
            || !self.attributes.is_empty()
    }

    /// The value or default as a string literal's content, if it is one.
    pub fn literal(&self) -> Option<&str> {
        self.value.as_deref().or(self.default_value.as_deref()).and_then(string_literal)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Content of `"text"`, `@"text"` or `$"text"`.
pub fn string_literal(text: &str) -> Option<&str> {
    let text = text.trim().trim_start_matches(['@', '$']);
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.contains('"')).then_some(inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Search,
    ParameterStart,
    DefaultValue,
    ExplicitValue,
}

#[derive(Debug)]
pub struct ParameterListParser {
    state: State,
    scope: ScopeTracker,
    working: String,
    angle_depth: usize,
    pending: DotNetParameter,
    next_index: usize,
    /// Attribute on the parameter being declared (`[FromBody] T x`).
    attribute: Option<Box<AttributeParser>>,
    ready: VecDeque<DotNetParameter>,
    closed: bool,
}

impl Default for ParameterListParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterListParser {
    pub fn new() -> Self {
        Self {
            state: State::Search,
            scope: ScopeTracker::new(),
            working: String::new(),
            angle_depth: 0,
            pending: DotNetParameter::default(),
            next_index: 0,
            attribute: None,
            ready: VecDeque::new(),
            closed: false,
        }
    }

    /// True once the list's closing `)` was consumed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Inside the parentheses.
    pub fn is_building(&self) -> bool {
        self.state != State::Search
    }

    fn append(&mut self, token: &Token) {
        let text = token.source_text();
        let needs_space = self.working.chars().last().is_some_and(is_word_char)
            && text.chars().next().is_some_and(is_word_char);
        if needs_space {
            self.working.push(' ');
        }
        self.working.push_str(&text);
    }

    fn take_working(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.working);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Close the pending parameter; `more` starts the next one.
    fn finalize(&mut self, more: bool) {
        let pending = std::mem::take(&mut self.pending);
        if pending.has_data() {
            self.ready.push_back(pending);
        }
        self.working.clear();
        self.angle_depth = 0;
        if more {
            self.next_index += 1;
            self.pending.index = self.next_index;
        }
    }

    /// `,` or `)` ended a declaration in `ParameterStart`.
    fn commit_declaration(&mut self) {
        if let Some(text) = self.take_working() {
            if self.pending.type_name.is_some() {
                self.pending.name = Some(text);
            } else if self.pending.name.is_none() {
                self.pending.value = Some(text);
            }
        }
    }

    fn close(&mut self) {
        self.state = State::Search;
        self.closed = true;
    }

    fn feed_attribute(&mut self, token: &Token) -> bool {
        let Some(parser) = self.attribute.as_mut() else {
            return false;
        };
        parser.process_token(token);
        while let Some(attribute) = parser.pull_item() {
            self.pending.attributes.push(attribute);
        }
        if parser.is_closed() {
            self.attribute = None;
        }
        true
    }

    fn parameter_start(&mut self, token: &Token) {
        if self.scope.paren_depth() == 0 {
            self.commit_declaration();
            self.finalize(false);
            self.close();
            return;
        }

        let nested = self.scope.paren_depth() > 1;
        match &token.kind {
            TokenKind::Word(_) | TokenKind::Quoted { .. } if self.pending.type_name.is_none() && !nested => {
                if token.word().is_some() && self.angle_depth == 0 && !self.working.is_empty() {
                    if self.working == "this" {
                        self.pending.is_extension = true;
                        self.working.clear();
                    } else if PARAMETER_MODIFIERS.contains(&self.working.as_str()) {
                        self.working.clear();
                    } else if is_valid_type_name(&self.working) {
                        self.pending.type_name = self.take_working();
                    }
                }
                self.append(token);
            }
            _ if nested => self.append(token),
            TokenKind::Punct(',') if self.angle_depth > 0 => self.append(token),
            TokenKind::Punct(',') => {
                self.commit_declaration();
                self.finalize(true);
            }
            TokenKind::Punct('=') => {
                if is_valid_identifier(&self.working) {
                    self.pending.name = self.take_working();
                    self.state = State::DefaultValue;
                } else {
                    self.append(token);
                }
            }
            TokenKind::Punct(':') if self.pending.type_name.is_none() && is_valid_identifier(&self.working) => {
                self.pending.name = self.take_working();
                self.state = State::ExplicitValue;
            }
            TokenKind::Punct('<') if is_partial_type_name(&self.working) => {
                self.angle_depth += 1;
                self.append(token);
            }
            TokenKind::Punct('>') if self.angle_depth > 0 => {
                self.angle_depth -= 1;
                self.append(token);
            }
            TokenKind::Punct('[') if self.working.is_empty() && self.pending.type_name.is_none() => {
                let mut parser = AttributeParser::new();
                parser.process_token(token);
                self.attribute = Some(Box::new(parser));
            }
            _ => self.append(token),
        }
    }

    fn value_state(&mut self, token: &Token, explicit: bool) {
        let at_list_level = self.scope.paren_depth() == 1 && self.scope.brace_depth() == 0;
        let closing = self.scope.paren_depth() == 0;
        if closing || (at_list_level && token.is_punct(',')) {
            let text = self.take_working();
            if explicit {
                self.pending.value = text;
            } else {
                self.pending.default_value = text;
            }
            if closing {
                self.finalize(false);
                self.close();
            } else {
                self.finalize(true);
                self.state = State::ParameterStart;
            }
            return;
        }
        self.append(token);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '"' || c == '\''
}

impl SubParser for ParameterListParser {
    type Item = DotNetParameter;

    fn process_token(&mut self, token: &Token) -> bool {
        if token.is_eof() {
            return false;
        }
        self.scope.interpret_token(token);
        if self.feed_attribute(token) {
            return true;
        }
        match self.state {
            State::Search => {
                if token.is_punct('(') && self.scope.paren_depth() == 1 {
                    self.state = State::ParameterStart;
                    self.closed = false;
                    self.pending = DotNetParameter::default();
                    self.next_index = 0;
                    return true;
                }
                false
            }
            State::ParameterStart => {
                self.parameter_start(token);
                true
            }
            State::DefaultValue => {
                self.value_state(token, false);
                true
            }
            State::ExplicitValue => {
                self.value_state(token, true);
                true
            }
        }
    }

    fn has_item(&self) -> bool {
        !self.ready.is_empty()
    }

    fn pull_item(&mut self) -> Option<DotNetParameter> {
        self.ready.pop_front()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Parse a complete argument list from `tokens` (starting at or before `(`).
pub fn parse_parameter_list(tokens: &[Token]) -> Vec<DotNetParameter> {
    let mut parser = ParameterListParser::new();
    let mut out = Vec::new();
    for token in tokens {
        parser.process_token(token);
        while let Some(param) = parser.pull_item() {
            out.push(param);
        }
        if parser.is_closed() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, TokenizerOptions};

    fn params(src: &str) -> Vec<DotNetParameter> {
        parse_parameter_list(&Tokenizer::tokenize(src, TokenizerOptions::CSHARP))
    }

    #[test]
    fn test_types_and_defaults() {
        let p = params("(int a, String b = \"x\")");
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].type_name.as_deref(), Some("int"));
        assert_eq!(p[0].name.as_deref(), Some("a"));
        assert_eq!(p[0].default_value, None);
        assert_eq!(p[1].type_name.as_deref(), Some("String"));
        assert_eq!(p[1].name.as_deref(), Some("b"));
        assert_eq!(p[1].default_value.as_deref(), Some("\"x\""));
        assert_eq!(p[1].index, 1);
    }

    #[test]
    fn test_generics_modifiers_and_extension() {
        let p = params("(this IQueryable<User> source, Dictionary<string, int> map, out int count, int[] ids, Guid? id = null)");
        assert!(p[0].is_extension);
        assert_eq!(p[0].type_name.as_deref(), Some("IQueryable<User>"));
        assert_eq!(p[0].name.as_deref(), Some("source"));
        assert_eq!(p[1].type_name.as_deref(), Some("Dictionary<string,int>"));
        assert_eq!(p[1].name.as_deref(), Some("map"));
        assert_eq!(p[2].type_name.as_deref(), Some("int"));
        assert_eq!(p[3].type_name.as_deref(), Some("int[]"));
        assert_eq!(p[4].type_name.as_deref(), Some("Guid?"));
        assert_eq!(p[4].default_value.as_deref(), Some("null"));
    }

    #[test]
    fn test_attribute_arguments() {
        let p = params("(\"api/[controller]\", Name = \"users\", Order = 2)");
        assert_eq!(p[0].value.as_deref(), Some("\"api/[controller]\""));
        assert_eq!(p[0].literal(), Some("api/[controller]"));
        assert_eq!(p[1].name.as_deref(), Some("Name"));
        assert_eq!(p[1].literal(), Some("users"));
        assert_eq!(p[2].default_value.as_deref(), Some("2"));
    }

    #[test]
    fn test_named_and_nested_values() {
        let p = params("(typeof(UserDto), statusCode: 200, Compute(1, 2))");
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].value.as_deref(), Some("typeof(UserDto)"));
        assert_eq!(p[1].name.as_deref(), Some("statusCode"));
        assert_eq!(p[1].value.as_deref(), Some("200"));
        assert_eq!(p[2].value.as_deref(), Some("Compute(1,2)"));
    }

    #[test]
    fn test_parameter_attributes() {
        let p = params("([FromQuery(Name = \"q\")] string query, [FromBody] CreateUser body)");
        assert_eq!(p[0].attributes[0].name, "FromQuery");
        assert_eq!(p[0].attributes[0].named("Name"), Some("q"));
        assert_eq!(p[0].type_name.as_deref(), Some("string"));
        assert_eq!(p[0].name.as_deref(), Some("query"));
        assert!(p[1].attribute("FromBody").is_some());
        assert_eq!(p[1].type_name.as_deref(), Some("CreateUser"));
    }

    #[test]
    fn test_empty_and_unclosed() {
        assert!(params("()").is_empty());
        let p = params("(int a, int");
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].name.as_deref(), Some("a"));
    }
}
