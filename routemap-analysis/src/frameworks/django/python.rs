//! Token-level helpers for Python sources: logical statements, call
//! arguments and import aliases.

use routemap_core::types::collections::FxHashMap;

use crate::scope::ScopeTracker;
use crate::tokenizer::Token;

/// Split a token stream into logical statements.
///
/// A statement ends where the next token starts on a later line while no
/// bracket is open. `Eof` is dropped.
pub fn statements(tokens: &[Token]) -> Vec<&[Token]> {
    let mut out = Vec::new();
    let mut scope = ScopeTracker::new();
    let mut start = 0;
    let mut last_line = 0;
    let mut end = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_eof() {
            break;
        }
        if i > start && token.line > last_line && scope.is_top_level() {
            out.push(&tokens[start..i]);
            start = i;
        }
        scope.interpret_token(token);
        last_line = token.line;
        end = i + 1;
    }
    if end > start {
        out.push(&tokens[start..end]);
    }
    out
}

/// Leading-whitespace width of every line; tabs count as eight.
pub fn line_indents(source: &str) -> Vec<usize> {
    source
        .lines()
        .map(|line| {
            line.chars()
                .take_while(|c| c.is_whitespace())
                .map(|c| if c == '\t' { 8 } else { 1 })
                .sum()
        })
        .collect()
}

/// `name=value` keyword argument, if `arg` is one.
pub fn keyword_arg(arg: &[Token]) -> Option<(&str, &[Token])> {
    match arg {
        [name, eq, value @ ..] if eq.is_punct('=') => Some((name.word()?, value)),
        _ => None,
    }
}

/// Concatenated string literals in `tokens` (`r'^a' 'b'` -> `^ab`).
pub fn string_literal(tokens: &[Token]) -> Option<String> {
    let mut text: Option<String> = None;
    for token in tokens {
        if let Some(q) = token.quoted() {
            text.get_or_insert_with(String::new).push_str(q);
        }
    }
    text
}

/// Tokens rendered back to compact source text.
pub fn expression_text(tokens: &[Token]) -> String {
    tokens.iter().map(Token::source_text).collect()
}

/// Local names bound by `import` / `from ... import` statements.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    names: FxHashMap<String, String>,
}

impl Imports {
    /// Record an import statement. Returns false if `stmt` is not one.
    pub fn record(&mut self, stmt: &[Token]) -> bool {
        match stmt.first().and_then(Token::word) {
            Some("from") => {
                let Some(import_at) = stmt.iter().position(|t| t.is_word("import")) else {
                    return true;
                };
                let module: String = stmt[1..import_at].iter().map(Token::source_text).collect();
                for (name, alias) in imported_names(&stmt[import_at + 1..]) {
                    let qualified = if module.ends_with('.') {
                        format!("{module}{name}")
                    } else {
                        format!("{module}.{name}")
                    };
                    self.names.insert(alias.unwrap_or(name).to_string(), qualified);
                }
                true
            }
            Some("import") => {
                for (name, alias) in imported_names(&stmt[1..]) {
                    self.names.insert(alias.unwrap_or(name).to_string(), name.to_string());
                }
                true
            }
            _ => false,
        }
    }

    /// Qualify `reference` through the longest imported prefix.
    pub fn resolve(&self, reference: &str) -> String {
        let mut prefix = reference;
        loop {
            if let Some(qualified) = self.names.get(prefix) {
                return format!("{qualified}{}", &reference[prefix.len()..]);
            }
            match prefix.rfind('.') {
                Some(idx) => prefix = &prefix[..idx],
                None => return reference.to_string(),
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}

/// `a, b as c, (d, e)` -> `[(a, None), (b, Some(c)), (d, None), (e, None)]`.
fn imported_names(tokens: &[Token]) -> Vec<(&str, Option<&str>)> {
    let mut names = Vec::new();
    let mut iter = tokens.iter().filter(|t| t.word().is_some()).peekable();
    while let Some(token) = iter.next() {
        let Some(name) = token.word() else { continue };
        if name == "as" {
            continue;
        }
        let alias = match iter.peek() {
            Some(next) if next.is_word("as") => {
                iter.next();
                iter.next().and_then(Token::word)
            }
            _ => None,
        };
        names.push((name, alias));
    }
    names
}
