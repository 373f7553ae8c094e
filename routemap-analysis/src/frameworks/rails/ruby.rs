//! Ruby call arguments as the routes DSL uses them: symbols, strings,
//! arrays (`[:a, :b]`, `%i[a b]`) and trailing options (`key: v`, `:key => v`).

use crate::scope::split_args;
use crate::tokenizer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RubyValue {
    Symbol(String),
    Str(String),
    Array(Vec<RubyValue>),
    /// Anything else, as source text.
    Other(String),
}

impl RubyValue {
    /// Symbol or string content.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) | Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Names of an array, or the single name of a scalar.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Array(items) => items.iter().filter_map(RubyValue::as_name).collect(),
            other => other.as_name().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    pub positional: Vec<RubyValue>,
    pub options: Vec<(String, RubyValue)>,
}

impl CallArgs {
    pub fn option(&self, key: &str) -> Option<&RubyValue> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn option_name(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(RubyValue::as_name)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.positional.first().and_then(RubyValue::as_name)
    }
}

/// Parse the argument tokens of a DSL call, with or without parentheses.
pub fn parse_args(tokens: &[Token]) -> CallArgs {
    let tokens = match tokens {
        [open, inner @ .., close] if open.is_punct('(') && close.is_punct(')') => inner,
        _ => tokens,
    };
    let mut args = CallArgs::default();
    for arg in split_args(tokens) {
        // a trailing `{ key: v }` hash literal holds options too
        if let [open, inner @ .., close] = arg {
            if open.is_punct('{') && close.is_punct('}') {
                for entry in split_args(inner) {
                    push_arg(&mut args, entry);
                }
                continue;
            }
        }
        push_arg(&mut args, arg);
    }
    args
}

fn push_arg(args: &mut CallArgs, arg: &[Token]) {
    match arg {
        [] => {}
        // key: value
        [key, colon, value @ ..] if colon.is_punct(':') && key.word().is_some() => {
            args.options.push((key.source_text(), parse_value(value)));
        }
        _ => match hash_rocket(arg) {
            Some(at) => {
                let key = parse_value(&arg[..at]);
                let value = parse_value(&arg[at + 2..]);
                match key {
                    RubyValue::Symbol(name) => args.options.push((name, value)),
                    // `get 'photos/search' => 'photos#search'`
                    other => {
                        args.positional.push(other);
                        args.options.push(("to".to_string(), value));
                    }
                }
            }
            None => args.positional.push(parse_value(arg)),
        },
    }
}

fn hash_rocket(tokens: &[Token]) -> Option<usize> {
    tokens
        .windows(2)
        .position(|pair| pair[0].is_punct('=') && pair[1].is_punct('>'))
}

pub fn parse_value(tokens: &[Token]) -> RubyValue {
    match tokens {
        [colon, name] if colon.is_punct(':') => match &name.kind {
            TokenKind::Word(w) => RubyValue::Symbol(w.clone()),
            TokenKind::Quoted { text, .. } => RubyValue::Symbol(text.clone()),
            _ => RubyValue::Other(text_of(tokens)),
        },
        [single] => match &single.kind {
            TokenKind::Quoted { text, .. } => RubyValue::Str(text.clone()),
            _ => RubyValue::Other(text_of(tokens)),
        },
        [open, inner @ .., close] if open.is_punct('[') && close.is_punct(']') => {
            RubyValue::Array(split_args(inner).into_iter().map(parse_value).collect())
        }
        // %i[a b] / %w(a b)
        [percent, kind, open, inner @ .., close]
            if percent.is_punct('%')
                && ((open.is_punct('[') && close.is_punct(']')) || (open.is_punct('(') && close.is_punct(')'))) =>
        {
            let symbols = kind.is_word("i");
            RubyValue::Array(
                inner
                    .iter()
                    .filter_map(Token::word)
                    .map(|w| {
                        if symbols {
                            RubyValue::Symbol(w.to_string())
                        } else {
                            RubyValue::Str(w.to_string())
                        }
                    })
                    .collect(),
            )
        }
        _ => RubyValue::Other(text_of(tokens)),
    }
}

fn text_of(tokens: &[Token]) -> String {
    tokens.iter().map(Token::source_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, TokenizerOptions};

    fn args(src: &str) -> CallArgs {
        let tokens = Tokenizer::tokenize(src, TokenizerOptions::RUBY);
        parse_args(&tokens[..tokens.len() - 1])
    }

    #[test]
    fn test_symbols_and_options() {
        let a = args(":photos, only: [:index, :show], controller: 'images', :path => 'pics'");
        assert_eq!(a.first_name(), Some("photos"));
        assert_eq!(a.option("only").unwrap().names(), vec!["index", "show"]);
        assert_eq!(a.option_name("controller"), Some("images"));
        assert_eq!(a.option_name("path"), Some("pics"));
    }

    #[test]
    fn test_parenthesised_and_percent_arrays() {
        let a = args("(:posts, except: %i[destroy edit], on: :member)");
        assert_eq!(a.first_name(), Some("posts"));
        assert_eq!(a.option("except").unwrap().names(), vec!["destroy", "edit"]);
        assert_eq!(a.option("on"), Some(&RubyValue::Symbol("member".into())));
    }

    #[test]
    fn test_string_hash_rocket_is_route() {
        let a = args("'photos/search' => 'photos#search', via: [:get, :post]");
        assert_eq!(a.positional, vec![RubyValue::Str("photos/search".into())]);
        assert_eq!(a.option_name("to"), Some("photos#search"));
        assert_eq!(a.option("via").unwrap().names(), vec!["get", "post"]);
    }

    #[test]
    fn test_other_values_kept_verbatim() {
        let a = args("ENGINE_PATH, constraints: { id: 1 }");
        assert_eq!(a.positional, vec![RubyValue::Other("ENGINE_PATH".into())]);
        assert!(matches!(a.option("constraints"), Some(RubyValue::Other(_))));
    }
}
