//! Java bean discovery: builds entity mappings from `public T getX()` accessors.

use crate::model::{EntityMappings, ModelField};
use crate::scope::ScopeTracker;
use crate::tokenizer::runner::{run_source, TokenConsumer};
use crate::tokenizer::{Token, TokenKind, TokenizerOptions};

/// Accessor-derived fields of every class declared in `source`.
pub fn discover(source: &str) -> EntityMappings {
    let mut scanner = BeanScanner::default();
    run_source(source, TokenizerOptions::JAVA, &mut scanner);
    scanner.mappings
}

#[derive(Default)]
struct BeanScanner {
    scope: ScopeTracker,
    expecting_class_name: bool,
    pending_class: Option<String>,
    /// (class name, brace depth of its body)
    classes: Vec<(String, usize)>,
    member: Vec<Token>,
    getter: Option<(String, String)>,
    mappings: EntityMappings,
}

impl BeanScanner {
    fn at_member_level(&self) -> bool {
        match self.classes.last() {
            Some((_, depth)) => self.scope.brace_depth() == *depth && self.scope.paren_depth() == 0,
            None => false,
        }
    }

    /// `public [final] Type getName(` with `Type` possibly generic or an array.
    fn getter_signature(&self) -> Option<(String, String)> {
        let n = self.member.len().checked_sub(1)?;
        let name = self.member[n].word()?;
        if name.len() <= 3 || !name.starts_with("get") {
            return None;
        }
        let words: Vec<&str> = self.member.iter().filter_map(Token::word).collect();
        if !words.contains(&"public") || words.contains(&"static") {
            return None;
        }

        let mut start = n.checked_sub(1)?;
        let mut depth = 0usize;
        loop {
            match self.member[start].kind {
                TokenKind::Punct('>') => depth += 1,
                TokenKind::Punct('<') => depth = depth.saturating_sub(1),
                TokenKind::Word(_) if depth == 0 => break,
                TokenKind::Punct(']' | '[' | ',' | '?') => {}
                TokenKind::Word(_) => {}
                _ => return None,
            }
            start = start.checked_sub(1)?;
        }
        let field_type: String = self.member[start..n].iter().map(Token::source_text).collect();
        if matches!(field_type.as_str(), "void" | "public") {
            return None;
        }
        Some((field_type, name.to_string()))
    }
}

impl TokenConsumer for BeanScanner {
    fn process_token(&mut self, token: &Token) {
        self.scope.interpret_token(token);

        if let Some((field_type, name)) = self.getter.take() {
            if token.is_punct(')') {
                if let Some((class, _)) = self.classes.last() {
                    let field = match optional_inner(&field_type) {
                        Some(inner) => ModelField::new(inner, &name, true),
                        None => ModelField::new(field_type, &name, false),
                    };
                    self.mappings.add_field(class, field);
                }
            }
        }

        match &token.kind {
            TokenKind::Word(w) if w == "class" => {
                self.expecting_class_name = true;
                return;
            }
            TokenKind::Word(w) if self.expecting_class_name => {
                self.pending_class = Some(w.clone());
                self.expecting_class_name = false;
                return;
            }
            TokenKind::Punct('{') => {
                if let Some(class) = self.pending_class.take() {
                    self.classes.push((class, self.scope.brace_depth()));
                }
                self.member.clear();
                return;
            }
            TokenKind::Punct('}') => {
                while self
                    .classes
                    .last()
                    .is_some_and(|(_, depth)| self.scope.brace_depth() < *depth)
                {
                    self.classes.pop();
                }
                self.member.clear();
                return;
            }
            _ => {}
        }

        if token.is_punct('(') && self.scope.paren_depth() == 1 && self.classes.last().is_some_and(|(_, d)| *d == self.scope.brace_depth()) {
            self.getter = self.getter_signature();
            self.member.clear();
            return;
        }
        if !self.at_member_level() {
            return;
        }
        match token.punct() {
            Some(';') | Some(')') => self.member.clear(),
            _ => self.member.push(token.clone()),
        }
    }
}

/// `Optional<T>` -> `T`.
fn optional_inner(field_type: &str) -> Option<&str> {
    field_type
        .strip_prefix("Optional<")
        .and_then(|rest| rest.strip_suffix('>'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = r#"
        package com.acme;

        @Entity
        public class User {
            private String name;
            private Address address;

            public String getName() { return name; }
            public void setName(String name) { this.name = name; }
            public Address getAddress() { return address; }
            public List<Role> getRoles() { return roles; }
            public Optional<String> getNickname() { return Optional.empty(); }
            public static User getDefault() { return null; }
            public String getLabel(Locale locale) { return ""; }
            private int getSecret() { return 1; }

            public static class Address {
                public String getCity() { return city; }
            }
        }
    "#;

    #[test]
    fn test_discover_getters() {
        let mappings = discover(USER);
        let fields: Vec<String> = mappings
            .fields_for("User")
            .unwrap()
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(
            fields,
            vec!["name:String", "address:Address", "roles:List<Role>", "nickname:String?"]
        );
    }

    #[test]
    fn test_nested_class() {
        let mappings = discover(USER);
        let city = &mappings.fields_for("Address").unwrap()[0];
        assert_eq!(city.parameter_key, "city");
        assert_eq!(mappings.len(), 2);
    }

    #[test]
    fn test_no_class_no_mappings() {
        assert!(discover("interface Repo { User getUser(); }").is_empty());
    }
}
