//! Lexical checks for C# declarations.

use std::sync::OnceLock;

use regex::Regex;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@?[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

fn type_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*(<[A-Za-z0-9_.,<>\[\]? ]*>)?(\[,*\])*\??$")
            .expect("valid type name regex")
    })
}

/// Keywords that can never name a parameter or a type.
const KEYWORDS: &[&str] = &[
    "new", "return", "null", "true", "false", "typeof", "nameof", "default", "this", "base",
];

/// Parameter modifiers that precede the type.
pub const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params", "scoped", "readonly"];

pub fn is_valid_identifier(text: &str) -> bool {
    identifier_regex().is_match(text) && !KEYWORDS.contains(&text)
}

/// `int`, `System.String`, `List<int>`, `int[]`, `Guid?`.
pub fn is_valid_type_name(text: &str) -> bool {
    type_name_regex().is_match(text) && !KEYWORDS.contains(&text)
}

/// A type name still being assembled: `List<`, `Dictionary<string,`.
pub fn is_partial_type_name(text: &str) -> bool {
    let open = text.matches('<').count();
    let close = text.matches('>').count();
    if open <= close {
        return is_valid_type_name(text);
    }
    let head = text.split('<').next().unwrap_or_default();
    is_valid_type_name(head)
}

/// `HttpGetAttribute` and `Microsoft.AspNetCore.Mvc.HttpGet` both name `HttpGet`.
pub fn attribute_name(raw: &str) -> &str {
    let simple = raw.rsplit('.').next().unwrap_or(raw);
    match simple.strip_suffix("Attribute") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => simple,
    }
}

/// Outer type without generics, nullability or array rank.
pub fn base_type_name(type_name: &str) -> &str {
    let end = type_name.find(['<', '[', '?']).unwrap_or(type_name.len());
    let name = &type_name[..end];
    name.rsplit('.').next().unwrap_or(name)
}

/// Element type of an array or common collection, if `type_name` is one.
pub fn element_type_name(type_name: &str) -> Option<&str> {
    if let Some(element) = type_name.strip_suffix("[]") {
        return Some(element);
    }
    let open = type_name.find('<')?;
    let outer = base_type_name(type_name);
    if !matches!(
        outer,
        "List" | "IList" | "IEnumerable" | "ICollection" | "IReadOnlyList" | "IReadOnlyCollection" | "HashSet" | "ISet"
    ) {
        return None;
    }
    type_name[open + 1..].strip_suffix('>')
}
