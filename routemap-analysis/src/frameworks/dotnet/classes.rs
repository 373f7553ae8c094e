//! C# class-structure parser: classes with their attributes, base types and
//! methods (attributes, parameters, line range). Method bodies are skipped by
//! brace depth; nothing inside them is interpreted.

use super::attributes::{Attribute, AttributeParser};
use super::parameters::{DotNetParameter, ParameterListParser};
use crate::frameworks::subparser::SubParser;
use crate::scope::ScopeTracker;
use crate::tokenizer::runner::TokenConsumer;
use crate::tokenizer::{Token, TokenKind};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "async", "virtual", "override", "abstract",
    "sealed", "new", "extern", "partial", "unsafe", "readonly", "required",
];

/// Declarations whose body is never a class member list we care about.
const SKIPPED_TYPES: &[&str] = &["struct", "interface", "enum", "record", "delegate", "event", "operator"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotNetMethod {
    pub name: String,
    pub return_type: Option<String>,
    pub attributes: Vec<Attribute>,
    pub parameters: Vec<DotNetParameter>,
    pub start_line: u32,
    pub end_line: u32,
    pub is_public: bool,
    pub is_static: bool,
}

impl DotNetMethod {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn is_extension_method(&self) -> bool {
        self.parameters.first().is_some_and(|p| p.is_extension)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotNetClass {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub base_types: Vec<String>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub start_line: u32,
    pub methods: Vec<DotNetMethod>,
}

impl DotNetClass {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Attribute> + 's {
        self.attributes.iter().filter(move |a| a.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Namespace or class member level.
    Members,
    /// Inside a `[...]` attribute section.
    Attributes,
    /// After `class`, waiting for the name.
    ClassName,
    /// Between the class name and `{`; `in_where` after a constraint clause.
    ClassHeader { in_bases: bool, in_where: bool, angle: usize },
    /// Inside a method parameter list.
    Parameters,
    /// After `)`: `{`, `=>`, `;`, `: base(...)` or `where ...`.
    AfterParameters,
    /// Inside a method body opened at brace depth `depth`.
    Body { depth: usize },
    /// Expression-bodied member or field initializer, up to `;`.
    ToSemicolon { commit: bool },
    /// Property accessors, nested non-class types.
    SkipBlock { depth: usize },
    /// `#region` and other preprocessor lines.
    Directive { line: u32 },
}

#[derive(Debug)]
struct OpenClass {
    class: DotNetClass,
    body_depth: usize,
}

pub struct ClassParser {
    scope: ScopeTracker,
    phase: Phase,
    attribute_parser: AttributeParser,
    parameter_parser: ParameterListParser,
    pending_attributes: Vec<Attribute>,
    declaration: Vec<Token>,
    namespace: Option<String>,
    class_modifiers: Vec<String>,
    header_bases: Vec<String>,
    open: Vec<OpenClass>,
    method: Option<DotNetMethod>,
    classes: Vec<DotNetClass>,
}

impl Default for ClassParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassParser {
    pub fn new() -> Self {
        Self {
            scope: ScopeTracker::new(),
            phase: Phase::Members,
            attribute_parser: AttributeParser::new(),
            parameter_parser: ParameterListParser::new(),
            pending_attributes: Vec::new(),
            declaration: Vec::new(),
            namespace: None,
            class_modifiers: Vec::new(),
            header_bases: Vec::new(),
            open: Vec::new(),
            method: None,
            classes: Vec::new(),
        }
    }

    /// Completed classes in order of their closing brace.
    pub fn into_classes(mut self) -> Vec<DotNetClass> {
        while let Some(open) = self.open.pop() {
            self.classes.push(open.class);
        }
        self.classes
    }

    fn member_depth(&self) -> usize {
        self.open.last().map_or(usize::MAX, |c| c.body_depth)
    }

    fn reset_declaration(&mut self) {
        self.declaration.clear();
        self.pending_attributes.clear();
    }

    fn declaration_words(&self) -> impl Iterator<Item = &str> {
        self.declaration.iter().filter_map(Token::word)
    }

    fn members(&mut self, token: &Token) {
        let at_member_level = self.scope.paren_depth() == 0
            && (self.open.is_empty() || self.scope.brace_depth() == self.member_depth());

        match &token.kind {
            TokenKind::Punct('[') if self.declaration.is_empty() && self.scope.bracket_depth() == 1 => {
                self.attribute_parser.reset();
                self.attribute_parser.process_token(token);
                self.phase = Phase::Attributes;
            }
            TokenKind::Punct('#') if self.declaration.is_empty() => {
                self.phase = Phase::Directive { line: token.line };
            }
            TokenKind::Word(w) if w == "class" && self.scope.paren_depth() == 0 => {
                self.class_modifiers = self.declaration_words().map(str::to_string).collect();
                if self.class_modifiers.iter().any(|m| SKIPPED_TYPES.contains(&m.as_str())) {
                    // `record class`
                    self.declaration.push(token.clone());
                } else {
                    self.declaration.clear();
                    self.phase = Phase::ClassName;
                }
            }
            TokenKind::Punct(';') => {
                if self.declaration.first().is_some_and(|t| t.is_word("namespace")) {
                    self.namespace = self.declaration.get(1).and_then(Token::word).map(str::to_string);
                }
                self.reset_declaration();
            }
            TokenKind::Punct('{') => {
                if self.declaration.first().is_some_and(|t| t.is_word("namespace")) {
                    self.namespace = self.declaration.get(1).and_then(Token::word).map(str::to_string);
                    self.reset_declaration();
                } else if !self.declaration.is_empty() {
                    self.reset_declaration();
                    self.phase = Phase::SkipBlock { depth: self.scope.brace_depth() };
                }
            }
            TokenKind::Punct('}') => {
                self.reset_declaration();
                if let Some(open) = self.open.last() {
                    if self.scope.brace_depth() < open.body_depth {
                        if let Some(open) = self.open.pop() {
                            self.classes.push(open.class);
                        }
                    }
                }
            }
            TokenKind::Punct('=') if at_member_level && !self.open.is_empty() => {
                self.reset_declaration();
                self.phase = Phase::ToSemicolon { commit: false };
            }
            TokenKind::Punct('(') if self.scope.paren_depth() == 1 => {
                if !self.open.is_empty() && !self.declaration.is_empty() {
                    self.start_method(token);
                } else {
                    self.declaration.push(token.clone());
                }
            }
            _ => self.declaration.push(token.clone()),
        }
    }

    fn start_method(&mut self, open_paren: &Token) {
        let words: Vec<&str> = self.declaration_words().collect();
        if words.iter().any(|w| SKIPPED_TYPES.contains(w)) {
            self.reset_declaration();
            self.phase = Phase::ToSemicolon { commit: false };
            return;
        }

        // Name is the last word, ignoring a generic parameter list `M<T>(`.
        let mut end = self.declaration.len();
        if self.declaration.last().is_some_and(|t| t.is_punct('>')) {
            if let Some(open) = self.declaration.iter().rposition(|t| t.is_punct('<')) {
                end = open;
            }
        }
        let Some(name_at) = self.declaration[..end].iter().rposition(|t| t.word().is_some()) else {
            self.reset_declaration();
            self.phase = Phase::ToSemicolon { commit: false };
            return;
        };

        let mut is_public = false;
        let mut is_static = false;
        let mut return_type = String::new();
        for token in &self.declaration[..name_at] {
            match token.word() {
                Some("public") => is_public = true,
                Some("static") => is_static = true,
                Some(w) if MODIFIERS.contains(&w) => {}
                _ => return_type.push_str(&token.source_text()),
            }
        }

        let name = self.declaration[name_at].source_text();
        let start_line = self.declaration[0].line;
        self.method = Some(DotNetMethod {
            name,
            return_type: (!return_type.is_empty()).then_some(return_type),
            attributes: std::mem::take(&mut self.pending_attributes),
            parameters: Vec::new(),
            start_line,
            end_line: start_line,
            is_public,
            is_static,
        });
        self.declaration.clear();
        self.parameter_parser.reset();
        self.parameter_parser.process_token(open_paren);
        self.phase = Phase::Parameters;
    }

    fn commit_method(&mut self, end_line: u32) {
        if let Some(mut method) = self.method.take() {
            method.end_line = end_line;
            if let Some(open) = self.open.last_mut() {
                open.class.methods.push(method);
            }
        }
        self.phase = Phase::Members;
    }

    fn class_header(&mut self, token: &Token, in_bases: bool, in_where: bool, angle: usize) {
        match token.kind {
            TokenKind::Punct('{') => {
                let class = DotNetClass {
                    name: self.declaration.first().map(Token::source_text).unwrap_or_default(),
                    namespace: self.namespace.clone(),
                    attributes: std::mem::take(&mut self.pending_attributes),
                    base_types: std::mem::take(&mut self.header_bases),
                    is_abstract: self.class_modifiers.iter().any(|m| m == "abstract"),
                    is_static: self.class_modifiers.iter().any(|m| m == "static"),
                    start_line: self.declaration.first().map_or(token.line, |t| t.line),
                    methods: Vec::new(),
                };
                self.declaration.clear();
                self.open.push(OpenClass {
                    class,
                    body_depth: self.scope.brace_depth(),
                });
                self.phase = Phase::Members;
            }
            TokenKind::Punct(';') => {
                // `class X(int a);` declares no members.
                self.declaration.clear();
                self.header_bases.clear();
                self.pending_attributes.clear();
                self.phase = Phase::Members;
            }
            _ if self.scope.paren_depth() > 0 || token.is_punct(')') => {}
            TokenKind::Punct(':') if !in_where => {
                self.phase = Phase::ClassHeader { in_bases: true, in_where, angle: 0 };
            }
            TokenKind::Punct('<') => {
                if in_bases && angle == 0 {
                    if let Some(base) = self.header_bases.last_mut() {
                        base.push('<');
                    }
                }
                self.phase = Phase::ClassHeader { in_bases, in_where, angle: angle + 1 };
            }
            TokenKind::Punct('>') => {
                let angle = angle.saturating_sub(1);
                if in_bases && angle == 0 {
                    if let Some(base) = self.header_bases.last_mut() {
                        base.push('>');
                    }
                }
                self.phase = Phase::ClassHeader { in_bases, in_where, angle };
            }
            TokenKind::Word(ref w) if w == "where" && angle == 0 => {
                self.phase = Phase::ClassHeader { in_bases: false, in_where: true, angle: 0 };
            }
            TokenKind::Word(ref w) if in_bases => {
                if angle == 0 {
                    self.header_bases.push(w.clone());
                } else if let Some(base) = self.header_bases.last_mut() {
                    if !base.ends_with('<') {
                        base.push(',');
                    }
                    base.push_str(w);
                }
            }
            _ => {}
        }
    }
}

impl TokenConsumer for ClassParser {
    fn process_token(&mut self, token: &Token) {
        if token.is_eof() {
            return;
        }
        self.scope.interpret_token(token);

        match self.phase {
            Phase::Members => self.members(token),
            Phase::Attributes => {
                self.attribute_parser.process_token(token);
                while let Some(attribute) = self.attribute_parser.pull_item() {
                    self.pending_attributes.push(attribute);
                }
                if self.attribute_parser.is_closed() {
                    self.phase = Phase::Members;
                }
            }
            Phase::ClassName => {
                if let Some(word) = token.word() {
                    self.declaration.push(Token::new(TokenKind::Word(word.to_string()), token.line));
                    self.header_bases.clear();
                    self.phase = Phase::ClassHeader { in_bases: false, in_where: false, angle: 0 };
                }
            }
            Phase::ClassHeader { in_bases, in_where, angle } => self.class_header(token, in_bases && !in_where, in_where, angle),
            Phase::Parameters => {
                self.parameter_parser.process_token(token);
                while let Some(param) = self.parameter_parser.pull_item() {
                    if let Some(method) = self.method.as_mut() {
                        method.parameters.push(param);
                    }
                }
                if self.parameter_parser.is_closed() {
                    self.phase = Phase::AfterParameters;
                }
            }
            Phase::AfterParameters => match token.punct() {
                Some('{') if self.scope.paren_depth() == 0 => {
                    self.phase = Phase::Body { depth: self.scope.brace_depth() };
                }
                Some('=') if self.scope.paren_depth() == 0 => self.phase = Phase::ToSemicolon { commit: true },
                Some(';') if self.scope.paren_depth() == 0 => self.commit_method(token.line),
                _ => {}
            },
            Phase::Body { depth } => {
                if token.is_punct('}') && self.scope.brace_depth() < depth {
                    self.commit_method(token.line);
                }
            }
            Phase::ToSemicolon { commit } => {
                let level = self.open.last().map_or(0, |c| c.body_depth);
                if token.is_punct(';') && self.scope.paren_depth() == 0 && self.scope.brace_depth() <= level {
                    if commit {
                        self.commit_method(token.line);
                    } else {
                        self.phase = Phase::Members;
                    }
                }
            }
            Phase::SkipBlock { depth } => {
                if token.is_punct('}') && self.scope.brace_depth() < depth {
                    self.phase = Phase::Members;
                }
            }
            Phase::Directive { line } => {
                if token.line != line {
                    self.phase = Phase::Members;
                    self.members(token);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::runner::run_source;
    use crate::tokenizer::TokenizerOptions;

    fn classes(src: &str) -> Vec<DotNetClass> {
        let mut parser = ClassParser::new();
        run_source(src, TokenizerOptions::CSHARP, &mut parser);
        parser.into_classes()
    }

    const CONTROLLER: &str = r#"
using Microsoft.AspNetCore.Mvc;

namespace Shop.Api.Controllers
{
    #region Users
    [ApiController]
    [Route("api/[controller]")]
    public class UsersController : ControllerBase, IDisposable
    {
        private readonly IUserService _users = new UserService();
        public int Count { get; set; } = 0;

        [HttpGet("{id:int}")]
        public async Task<ActionResult<UserDto>> Get(int id, [FromQuery] bool verbose = false)
        {
            if (id < 0) { return NotFound(); }
            return Ok(await _users.Find(id));
        }

        public IActionResult Ping() => Ok("pong");

        private void Helper(string s) { }

        public UsersController(IUserService users) : base() { }
    }
    #endregion
}
"#;

    #[test]
    fn test_class_structure() {
        let c = classes(CONTROLLER);
        assert_eq!(c.len(), 1);
        let class = &c[0];
        assert_eq!(class.name, "UsersController");
        assert_eq!(class.namespace.as_deref(), Some("Shop.Api.Controllers"));
        assert_eq!(class.base_types, vec!["ControllerBase", "IDisposable"]);
        let attrs: Vec<&str> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["ApiController", "Route"]);

        let names: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Get", "Ping", "Helper", "UsersController"]);
    }

    #[test]
    fn test_method_details() {
        let c = classes(CONTROLLER);
        let get = &c[0].methods[0];
        assert!(get.is_public);
        assert_eq!(get.return_type.as_deref(), Some("Task<ActionResult<UserDto>>"));
        assert_eq!(get.attribute("HttpGet").and_then(Attribute::first_literal), Some("{id:int}"));
        assert_eq!(get.parameters.len(), 2);
        assert_eq!(get.parameters[1].name.as_deref(), Some("verbose"));
        assert_eq!(get.parameters[1].default_value.as_deref(), Some("false"));
        assert!(get.parameters[1].attribute("FromQuery").is_some());
        assert_eq!((get.start_line, get.end_line), (15, 19));

        let ping = &c[0].methods[1];
        assert_eq!((ping.start_line, ping.end_line), (21, 21));
        assert!(!c[0].methods[2].is_public);
    }

    #[test]
    fn test_nested_and_generic_classes() {
        let src = "class Outer<T> where T : class { class Inner : Base<T, int> { void M() {} } void N() {} }";
        let c = classes(src);
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].name, "Inner");
        assert_eq!(c[0].base_types, vec!["Base<T,int>"]);
        assert_eq!(c[0].methods[0].name, "M");
        assert_eq!(c[1].name, "Outer");
        assert_eq!(c[1].methods[0].name, "N");
    }
}
