//! URLconf parsing: `path()`, `re_path()`, `url()` and `include()` entries
//! of a `urls.py` module.

use std::sync::OnceLock;

use regex::Regex;

use super::python::{expression_text, keyword_arg, statements, string_literal, Imports};
use crate::scope::{matching_close, split_args};
use crate::tokenizer::Token;

const PATTERN_FUNCTIONS: &[&str] = &["path", "re_path", "url"];

/// What a URL pattern routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    /// Qualified view reference, e.g. `.views.detail` or `blog.views.Index`.
    View(String),
    /// Dotted module name of an included URLconf.
    Include(String),
    /// `include([...])` with inline patterns.
    Nested(Vec<UrlPattern>),
    /// `admin.site.urls`.
    AdminSite,
    /// Anything else, kept verbatim.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    /// Normalized route fragment with `{name}` placeholders.
    pub route: String,
    /// Placeholder names with their converter type, when one was declared.
    pub params: Vec<(String, Option<String>)>,
    pub target: UrlTarget,
    pub line: u32,
    /// The route could not be read as a literal; `route` holds the expression.
    pub dynamic_route: bool,
}

/// Patterns of one `urls.py`, in declaration order.
pub fn parse_urlconf(tokens: &[Token]) -> Vec<UrlPattern> {
    let mut imports = Imports::default();
    let mut patterns = Vec::new();
    for stmt in statements(tokens) {
        if imports.record(stmt) {
            continue;
        }
        patterns.extend(collect_patterns(stmt, &imports));
    }
    patterns
}

fn collect_patterns(tokens: &[Token], imports: &Imports) -> Vec<UrlPattern> {
    let mut patterns = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let Some((pattern, next)) = parse_pattern_call(tokens, i, imports) {
            patterns.push(pattern);
            i = next;
        } else {
            i += 1;
        }
    }
    patterns
}

fn parse_pattern_call(tokens: &[Token], at: usize, imports: &Imports) -> Option<(UrlPattern, usize)> {
    let name = tokens[at].word()?;
    let function = name.rsplit('.').next().unwrap_or(name);
    if !PATTERN_FUNCTIONS.contains(&function) || !tokens.get(at + 1)?.is_punct('(') {
        return None;
    }
    let close = matching_close(tokens, at + 1)?;
    let args = split_args(&tokens[at + 2..close]);
    let route_arg = args.first().copied().unwrap_or(&[]);
    let target_arg = args.get(1).copied().unwrap_or(&[]);

    let (route, params, dynamic_route) = match string_literal(route_arg) {
        Some(raw) if function == "path" => {
            let (route, params) = normalize_path_route(&raw);
            (route, params, false)
        }
        Some(raw) => {
            let (route, params) = normalize_regex_route(&raw);
            (route, params, false)
        }
        None => (expression_text(route_arg), Vec::new(), true),
    };

    let pattern = UrlPattern {
        route,
        params,
        target: parse_target(target_arg, imports),
        line: tokens[at].line,
        dynamic_route,
    };
    Some((pattern, close + 1))
}

fn parse_target(arg: &[Token], imports: &Imports) -> UrlTarget {
    let arg = keyword_arg(arg).map(|(_, value)| value).unwrap_or(arg);
    match arg {
        [] => UrlTarget::Unresolved(String::new()),
        [head, open, ..] if is_include(head) && open.is_punct('(') => {
            let inner = matching_close(arg, 1).map(|close| &arg[2..close]).unwrap_or(&arg[2..]);
            parse_include(inner, imports)
        }
        [single] => match (single.word(), single.quoted()) {
            (Some(w), _) if is_admin_urls(w) => UrlTarget::AdminSite,
            (Some(w), _) => UrlTarget::View(imports.resolve(w)),
            (None, Some(q)) => UrlTarget::View(q.to_string()),
            _ => UrlTarget::Unresolved(expression_text(arg)),
        },
        // `Index.as_view()` / `Index.as_view(template_name=...)`
        [view, open, ..] if open.is_punct('(') => match view.word().and_then(|w| w.strip_suffix(".as_view")) {
            Some(class) => UrlTarget::View(imports.resolve(class)),
            None => UrlTarget::Unresolved(expression_text(arg)),
        },
        _ => UrlTarget::Unresolved(expression_text(arg)),
    }
}

fn parse_include(inner: &[Token], imports: &Imports) -> UrlTarget {
    let first_arg = split_args(inner).first().copied().unwrap_or(&[]);
    match first_arg {
        [open, ..] if open.is_punct('[') => {
            let close = matching_close(first_arg, 0).unwrap_or(first_arg.len());
            UrlTarget::Nested(collect_patterns(&first_arg[..close], imports))
        }
        // include(('app.urls', 'app'))
        [open, ..] if open.is_punct('(') => match string_literal(first_arg) {
            Some(module) => UrlTarget::Include(module),
            None => UrlTarget::Unresolved(expression_text(first_arg)),
        },
        [single] => match (single.word(), single.quoted()) {
            (None, Some(module)) => UrlTarget::Include(module.to_string()),
            (Some(w), _) if is_admin_urls(w) => UrlTarget::AdminSite,
            (Some(w), _) if imports.contains(w.split('.').next().unwrap_or(w)) => {
                UrlTarget::Include(imports.resolve(w))
            }
            _ => UrlTarget::Unresolved(expression_text(first_arg)),
        },
        _ => UrlTarget::Unresolved(expression_text(first_arg)),
    }
}

fn is_include(token: &Token) -> bool {
    token
        .word()
        .is_some_and(|w| w == "include" || w.ends_with(".include"))
}

fn is_admin_urls(word: &str) -> bool {
    word == "admin.site.urls" || word.ends_with(".admin.site.urls")
}

fn converter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?:(\w+):)?(\w+)>").expect("valid converter regex"))
}

fn named_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\?P<(\w+)>").expect("valid named group regex"))
}

/// `blog/<int:year>/<slug>/` -> `blog/{year}/{slug}/` with `year: int`.
pub fn normalize_path_route(raw: &str) -> (String, Vec<(String, Option<String>)>) {
    let re = converter_regex();
    let params = re
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[2].to_string();
            let converter = caps.get(1).map(|m| converter_type(m.as_str()).to_string());
            (name, converter)
        })
        .collect();
    let route = re.replace_all(raw, "{$2}").into_owned();
    (route, params)
}

fn converter_type(converter: &str) -> &str {
    match converter {
        "int" => "int",
        "str" | "slug" | "path" => "str",
        "uuid" => "uuid",
        other => other,
    }
}

/// `^articles/(?P<year>[0-9]{4})/$` -> `articles/{year}/`.
///
/// Unnamed groups and other regex syntax are kept verbatim.
pub fn normalize_regex_route(raw: &str) -> (String, Vec<(String, Option<String>)>) {
    let raw = raw.strip_prefix('^').unwrap_or(raw);
    let raw = raw.strip_suffix('$').unwrap_or(raw);

    let mut route = String::with_capacity(raw.len());
    let mut params = Vec::new();
    let mut rest = raw;
    while let Some(caps) = named_group_regex().captures(rest) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        route.push_str(&rest[..whole.start()]);
        route.push('{');
        route.push_str(name.as_str());
        route.push('}');
        params.push((name.as_str().to_string(), None));
        rest = &rest[group_end(rest, whole.start())..];
    }
    route.push_str(rest);
    (unescape(&route), params)
}

/// Byte index just past the group opened at `open`.
fn group_end(text: &str, open: usize) -> usize {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in text[open..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return open + i + 1;
                }
            }
            _ => {}
        }
    }
    text.len()
}

fn unescape(route: &str) -> String {
    let mut out = String::with_capacity(route.len());
    let mut chars = route.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
