//! View parser.
//!
//! Given the view a URL pattern routes to, finds its `def` (or `class`) in a
//! views module and recovers HTTP methods, parameters and authorization.
//! Declarations with any other name are skipped; nothing is built for them.

use routemap_core::types::Framework;

use super::python::{expression_text, line_indents};
use crate::aggregate::{combine_authorization, EndpointCandidate};
use crate::frameworks::ExtractionContext;
use crate::model::path::path_parameters;
use crate::model::{HttpMethod, Parameter, ParameterSource};
use crate::scanner::types::SourceFile;
use crate::scope::{matching_close, split_args, ScopeTracker};
use crate::tokenizer::runner::TokenConsumer;
use crate::tokenizer::{Token, TokenKind, TokenizerOptions};

const SKIPPED_ARGUMENTS: &[&str] = &["self", "cls", "request"];
const VIEW_VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// One routed view: the full URL template and the function or class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTarget {
    pub path: String,
    pub view: String,
    /// Placeholder converter types collected along the include chain.
    pub param_types: Vec<(String, Option<String>)>,
}

/// Parse the declaration of `target.view` in `source`.
///
/// Returns `None` when the file does not declare it.
pub fn parse_view(
    file: &SourceFile,
    source: &str,
    target: &ViewTarget,
    ctx: &ExtractionContext<'_>,
) -> Option<EndpointCandidate> {
    let mut parser = ViewParser::new(file, source, target, ctx);
    ctx.run(source, TokenizerOptions::PYTHON, &mut parser);
    parser.result
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Scanning,
    Decorator,
    DefName { indent: usize },
    ClassName { indent: usize },
    Params,
    Body,
    /// After `request.GET` & co, waiting for the key.
    Capture { source: ParameterSource, opened: bool },
    /// After `request.method`, collecting compared verbs.
    MethodCheck,
}

struct Pending {
    candidate: EndpointCandidate,
    decorator_methods: bool,
    body_methods: Vec<HttpMethod>,
}

struct ViewParser<'a> {
    file: &'a SourceFile,
    target: &'a ViewTarget,
    ctx: &'a ExtractionContext<'a>,
    indents: Vec<usize>,
    scope: ScopeTracker,
    state: State,
    line: u32,
    decorators: Vec<Vec<Token>>,
    decorator: Vec<Token>,
    params: Vec<Token>,
    /// Open classes: (indent, is the target).
    classes: Vec<(usize, bool)>,
    /// Indent of the `def` whose body is being read.
    def_indent: usize,
    pending: Option<Pending>,
    result: Option<EndpointCandidate>,
    done: bool,
}

impl<'a> ViewParser<'a> {
    fn new(
        file: &'a SourceFile,
        source: &str,
        target: &'a ViewTarget,
        ctx: &'a ExtractionContext<'a>,
    ) -> Self {
        Self {
            file,
            target,
            ctx,
            indents: line_indents(source),
            scope: ScopeTracker::new(),
            state: State::Scanning,
            line: 0,
            decorators: Vec::new(),
            decorator: Vec::new(),
            params: Vec::new(),
            classes: Vec::new(),
            def_indent: 0,
            pending: None,
            result: None,
            done: false,
        }
    }

    fn indent_of(&self, line: u32) -> usize {
        self.indents
            .get((line as usize).saturating_sub(1))
            .copied()
            .unwrap_or(0)
    }

    fn in_function_body(&self) -> bool {
        matches!(
            self.state,
            State::Params | State::Body | State::Capture { .. } | State::MethodCheck
        )
    }

    fn in_target_class(&self) -> bool {
        self.classes.iter().any(|(_, is_target)| *is_target)
    }

    fn on_line_start(&mut self, indent: usize) {
        if self.state == State::Decorator {
            self.decorators.push(std::mem::take(&mut self.decorator));
            self.state = State::Scanning;
        }
        if self.in_function_body() && indent <= self.def_indent {
            self.state = State::Scanning;
            if !self.in_target_class() {
                self.commit();
            }
        }
        while let Some(&(class_indent, is_target)) = self.classes.last() {
            if indent > class_indent {
                break;
            }
            self.classes.pop();
            if is_target {
                self.commit();
            }
        }
    }

    fn start_candidate(&mut self, line: u32, action: &str) {
        let mut candidate = EndpointCandidate::new(
            Framework::Django,
            self.file.path.clone(),
            self.file.relative_path.clone(),
        );
        candidate.base_paths.push(self.target.path.clone());
        candidate.controller = Some(module_name(&self.file.relative_path));
        candidate.action = Some(action.to_string());
        candidate.start_line = line;
        candidate.end_line = line;
        self.pending = Some(Pending {
            candidate,
            decorator_methods: false,
            body_methods: Vec::new(),
        });
    }

    fn apply_decorators(&mut self) {
        let decorators = std::mem::take(&mut self.decorators);
        if let Some(pending) = self.pending.as_mut() {
            for decorator in &decorators {
                apply_decorator(pending, decorator);
            }
        }
    }

    fn on_def_name(&mut self, name: &str, indent: usize) {
        let enclosing = self.classes.last().copied();
        match enclosing {
            Some((class_indent, true)) if indent > class_indent => {
                match VIEW_VERBS.contains(&name).then(|| name.parse::<HttpMethod>().ok()).flatten() {
                    Some(method) => {
                        self.apply_decorators();
                        if let Some(pending) = self.pending.as_mut() {
                            if !pending.candidate.methods.contains(&method) {
                                pending.candidate.methods.push(method);
                            }
                        }
                        self.enter_params(indent);
                    }
                    None => self.state = State::Scanning,
                }
            }
            None if name == self.target.view => {
                self.start_candidate(self.line, name);
                self.apply_decorators();
                self.enter_params(indent);
            }
            _ => self.state = State::Scanning,
        }
        self.decorators.clear();
    }

    fn enter_params(&mut self, indent: usize) {
        self.def_indent = indent;
        self.params.clear();
        self.state = State::Params;
    }

    fn on_class_name(&mut self, name: &str, indent: usize) {
        let is_target = name == self.target.view && !self.in_target_class() && self.pending.is_none();
        self.classes.push((indent, is_target));
        if is_target {
            self.start_candidate(self.line, name);
            self.apply_decorators();
        }
        self.decorators.clear();
        self.state = State::Scanning;
    }

    fn add_signature_params(&mut self) {
        let tokens = std::mem::take(&mut self.params);
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        for arg in split_args(&tokens) {
            let Some(name) = arg.first().and_then(Token::word) else {
                // `*args`, `**kwargs`, bare `*` and `/`
                continue;
            };
            if SKIPPED_ARGUMENTS.contains(&name) {
                continue;
            }
            let mut param = Parameter::new(name, ParameterSource::Unknown);
            let eq = arg.iter().position(|t| t.is_punct('='));
            if arg.get(1).is_some_and(|t| t.is_punct(':')) {
                let annotation = expression_text(&arg[2..eq.unwrap_or(arg.len())]);
                if !annotation.is_empty() {
                    param = param.with_data_type(annotation);
                }
            }
            if let Some(eq) = eq {
                let default = expression_text(&arg[eq + 1..]);
                if !default.is_empty() {
                    param = param.with_default(default);
                }
            }
            pending.candidate.add_parameter(param);
        }
    }

    fn on_body_word(&mut self, word: &str) {
        let Some(attr) = request_attribute(word) else {
            return;
        };
        let (method, source) = match attr {
            "GET" => (Some(HttpMethod::Get), ParameterSource::Query),
            "query_params" => (None, ParameterSource::Query),
            "POST" | "FILES" => (Some(HttpMethod::Post), ParameterSource::Body),
            "data" => (None, ParameterSource::Body),
            "COOKIES" => (None, ParameterSource::Cookie),
            "session" => (None, ParameterSource::Session),
            "method" => {
                self.state = State::MethodCheck;
                return;
            }
            _ => return,
        };
        if let (Some(method), Some(pending)) = (method, self.pending.as_mut()) {
            pending.body_methods.push(method);
        }
        self.state = State::Capture { source, opened: false };
    }

    fn on_capture(&mut self, token: &Token, source: ParameterSource, opened: bool) {
        if !opened {
            self.state = if token.is_punct('(') || token.is_punct('[') {
                State::Capture { source, opened: true }
            } else {
                State::Body
            };
            return;
        }
        match &token.kind {
            TokenKind::Quoted { text, .. } => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.candidate.add_parameter(Parameter::new(text.as_str(), source));
                }
            }
            TokenKind::Word(w) => {
                self.ctx
                    .report_partial(self.file, token.line, Framework::Django, format!("dynamic request key `{w}`"));
            }
            _ => {}
        }
        self.state = State::Body;
    }

    fn on_method_check(&mut self, token: &Token) {
        match &token.kind {
            TokenKind::Quoted { text, .. } => {
                if let (Some(method), Some(pending)) = (HttpMethod::from_source(text), self.pending.as_mut()) {
                    pending.body_methods.push(method);
                }
            }
            TokenKind::Punct('=' | '(' | '[' | ',') => {}
            TokenKind::Word(w) if w == "in" => {}
            _ => self.state = State::Body,
        }
    }

    fn commit(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Pending {
            mut candidate,
            decorator_methods,
            body_methods,
        } = pending;

        if candidate.methods.is_empty() && !decorator_methods {
            for method in body_methods {
                if !candidate.methods.contains(&method) {
                    candidate.methods.push(method);
                }
            }
        }
        let placeholders = path_parameters(&self.target.path);
        for (name, data_type) in &self.target.param_types {
            let mut param = Parameter::new(name.as_str(), ParameterSource::Path);
            if let Some(data_type) = data_type {
                param = param.with_data_type(data_type.as_str());
            }
            candidate.add_parameter(param);
        }
        for param in candidate.parameters.values_mut() {
            if !placeholders.contains(&param.name) {
                param.narrow_source(ParameterSource::Query);
            }
        }
        self.result = Some(candidate);
        self.done = true;
    }
}

impl TokenConsumer for ViewParser<'_> {
    fn process_token(&mut self, token: &Token) {
        if token.is_eof() {
            if self.in_function_body() && !self.in_target_class() {
                self.commit();
            }
            if self.in_target_class() {
                self.commit();
            }
            return;
        }

        let line_start = token.line != self.line && self.scope.is_top_level();
        self.line = token.line;
        if line_start {
            self.on_line_start(self.indent_of(token.line));
            if self.done {
                return;
            }
        }
        self.scope.interpret_token(token);
        if let Some(pending) = self.pending.as_mut() {
            pending.candidate.end_line = token.line;
        }

        match self.state.clone() {
            State::Scanning => match &token.kind {
                TokenKind::Punct('@') if line_start => {
                    self.decorator.clear();
                    self.state = State::Decorator;
                }
                TokenKind::Word(w) if w == "def" => {
                    self.state = State::DefName {
                        indent: self.indent_of(token.line),
                    };
                }
                TokenKind::Word(w) if w == "class" => {
                    self.state = State::ClassName {
                        indent: self.indent_of(token.line),
                    };
                }
                TokenKind::Word(w) if w == "async" => {}
                _ if line_start => self.decorators.clear(),
                _ => {}
            },
            State::Decorator => self.decorator.push(token.clone()),
            State::DefName { indent } => match token.word() {
                Some(name) => self.on_def_name(name, indent),
                None => self.state = State::Scanning,
            },
            State::ClassName { indent } => match token.word() {
                Some(name) => self.on_class_name(name, indent),
                None => self.state = State::Scanning,
            },
            State::Params => {
                if token.is_punct(')') && self.scope.paren_depth() == 0 {
                    self.add_signature_params();
                    self.state = State::Body;
                } else if !(token.is_punct('(') && self.scope.paren_depth() == 1) {
                    self.params.push(token.clone());
                }
            }
            State::Body => {
                if let Some(word) = token.word() {
                    self.on_body_word(word);
                }
            }
            State::Capture { source, opened } => self.on_capture(token, source, opened),
            State::MethodCheck => self.on_method_check(token),
        }
    }

    fn should_continue(&self) -> bool {
        !self.done
    }
}

/// `request.GET.get` -> `GET`; also `self.request.…`.
fn request_attribute(word: &str) -> Option<&str> {
    let rest = word
        .strip_prefix("self.request.")
        .or_else(|| word.strip_prefix("request."))?;
    rest.split('.').next()
}

fn apply_decorator(pending: &mut Pending, tokens: &[Token]) {
    let Some(qualified) = tokens.first().and_then(Token::word) else {
        return;
    };
    let name = qualified.rsplit('.').next().unwrap_or(qualified);
    let args = match tokens.get(1) {
        Some(open) if open.is_punct('(') => {
            let close = matching_close(tokens, 1).unwrap_or(tokens.len());
            &tokens[2..close.max(2)]
        }
        _ => &[][..],
    };
    let candidate = &mut pending.candidate;
    match name {
        "method_decorator" => {
            if let Some(inner) = split_args(args).first() {
                apply_decorator(pending, inner);
            }
        }
        "login_required" | "staff_member_required" | "permission_required" | "user_passes_test"
        | "permission_classes" => {
            let expression = expression_text(tokens);
            candidate.authorization = combine_authorization(candidate.authorization.as_deref(), Some(&expression));
        }
        "require_GET" => set_decorator_methods(pending, vec![HttpMethod::Get]),
        "require_safe" => set_decorator_methods(pending, vec![HttpMethod::Get, HttpMethod::Head]),
        "require_POST" => set_decorator_methods(pending, vec![HttpMethod::Post]),
        "require_http_methods" | "api_view" => {
            let methods: Vec<HttpMethod> = args
                .iter()
                .filter_map(Token::quoted)
                .filter_map(HttpMethod::from_source)
                .collect();
            if !methods.is_empty() {
                set_decorator_methods(pending, methods);
            }
        }
        _ => {}
    }
}

fn set_decorator_methods(pending: &mut Pending, methods: Vec<HttpMethod>) {
    pending.decorator_methods = true;
    pending.candidate.methods = methods;
}

/// `blog/views.py` -> `blog.views`.
fn module_name(relative_path: &str) -> String {
    let stem = relative_path.strip_suffix(".py").unwrap_or(relative_path);
    let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
    stem.replace('/', ".")
}
