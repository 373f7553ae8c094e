//! Path template normalization and matching.

/// Collapse repeated `/`, guarantee one leading `/` and no trailing `/`
/// (the root stays `/`).
pub fn normalize_path(raw: &str) -> String {
    let segments: Vec<&str> = raw.trim().split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::with_capacity(raw.len() + 1);
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Join a base path and a sub path, then normalize.
pub fn join_paths(base: &str, sub: &str) -> String {
    normalize_path(&format!("{base}/{sub}"))
}

/// Placeholder names declared in a template: `{id}`, `{id:int}`, `{id?}`,
/// `{*rest}`, `:id`, `*glob` and `<int:id>`.
pub fn path_parameters(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    for segment in template.split('/') {
        let mut rest = segment;
        while let Some(open) = rest.find(['{', '<']) {
            let close_char = if rest[open..].starts_with('{') { '}' } else { '>' };
            let Some(len) = rest[open..].find(close_char) else {
                break;
            };
            let inner = &rest[open + 1..open + len];
            let name = if close_char == '>' {
                inner.rsplit(':').next().unwrap_or(inner)
            } else {
                inner.split([':', '=']).next().unwrap_or(inner)
            };
            let name = name.trim_matches(|c: char| c == '*' || c == '?' || c.is_whitespace());
            if !name.is_empty() {
                names.push(name.to_string());
            }
            rest = &rest[open + len + 1..];
        }
        let bare = segment.trim_start_matches('(');
        if let Some(name) = bare.strip_prefix(':').or_else(|| bare.strip_prefix('*')) {
            let name: String = name
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                names.push(name);
            }
        }
    }
    names
}

fn is_placeholder(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}'))
        || (segment.starts_with('<') && segment.ends_with('>'))
        || segment.starts_with(':')
}

fn is_catch_all(segment: &str) -> bool {
    segment.starts_with('*') || segment.starts_with("{*") || segment == "**"
}

/// Whether a concrete request path matches `template`.
///
/// Query strings and trailing slashes on `url` are ignored; placeholder
/// segments match any single segment and catch-alls match the remainder.
pub fn template_matches(template: &str, url: &str) -> bool {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let url = normalize_path(url);
    let template = normalize_path(template);

    let mut t_segments = template.split('/').skip(1).filter(|s| !s.is_empty());
    let mut u_segments = url.split('/').skip(1).filter(|s| !s.is_empty());

    loop {
        match (t_segments.next(), u_segments.next()) {
            (None, None) => return true,
            (Some(t), _) if is_catch_all(t) => return true,
            (Some(t), Some(u)) => {
                if !(is_placeholder(t) || t.eq_ignore_ascii_case(u)) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
