//! Framework-agnostic lexer producing words, punctuation, quoted strings and EOF.
//!
//! Whitespace and comments are never emitted. Each token carries the 1-based
//! line it starts on.

pub mod cache;
pub mod runner;

use crate::scanner::language_detect::Language;

/// Lexical category of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier, keyword or number. Dotted chains like `request.GET` are one word.
    Word(String),
    /// Any other single non-whitespace character.
    Punct(char),
    /// A quoted literal; `text` is the unescaped content.
    Quoted { quote: char, text: String },
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }

    /// Text of a word or quoted string.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            TokenKind::Quoted { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn quoted(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Quoted { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn punct(&self) -> Option<char> {
        match self.kind {
            TokenKind::Punct(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.punct() == Some(c)
    }

    pub fn is_word(&self, w: &str) -> bool {
        self.word() == Some(w)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Re-render the token as it appeared in source (quotes restored).
    pub fn source_text(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) => w.clone(),
            TokenKind::Punct(c) => c.to_string(),
            TokenKind::Quoted { quote, text } => format!("{quote}{text}{quote}"),
            TokenKind::Eof => String::new(),
        }
    }
}

/// Per-language lexical conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub line_comments: &'static [&'static str],
    pub block_comments: &'static [(&'static str, &'static str)],
    pub quote_chars: &'static [char],
    /// Recognise `'''` / `"""` strings.
    pub triple_quotes: bool,
    /// Join `a.b.c` into a single word.
    pub dotted_words: bool,
    /// C# `@"..."` strings: backslashes are literal, `""` is a quote.
    pub verbatim_strings: bool,
    /// Block comment delimiters only count at the start of a line (Ruby `=begin`).
    pub anchored_block_comments: bool,
    /// Distinguishes option sets in cache keys.
    pub id: u64,
}

impl TokenizerOptions {
    pub const JAVA: Self = Self {
        line_comments: &["//"],
        block_comments: &[("/*", "*/")],
        quote_chars: &['"', '\''],
        triple_quotes: false,
        dotted_words: true,
        verbatim_strings: false,
        anchored_block_comments: false,
        id: 1,
    };

    pub const CSHARP: Self = Self {
        line_comments: &["//"],
        block_comments: &[("/*", "*/")],
        quote_chars: &['"', '\''],
        triple_quotes: false,
        dotted_words: true,
        verbatim_strings: true,
        anchored_block_comments: false,
        id: 2,
    };

    pub const PYTHON: Self = Self {
        line_comments: &["#"],
        block_comments: &[],
        quote_chars: &['"', '\''],
        triple_quotes: true,
        dotted_words: true,
        verbatim_strings: false,
        anchored_block_comments: false,
        id: 3,
    };

    pub const RUBY: Self = Self {
        line_comments: &["#"],
        block_comments: &[("=begin", "=end")],
        quote_chars: &['"', '\''],
        triple_quotes: false,
        dotted_words: true,
        verbatim_strings: false,
        anchored_block_comments: true,
        id: 4,
    };

    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Java => Self::JAVA,
            Language::CSharp => Self::CSHARP,
            Language::Python => Self::PYTHON,
            Language::Ruby => Self::RUBY,
        }
    }
}

/// Streaming tokenizer. Yields tokens in file order, ending with a single `Eof`.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    options: TokenizerOptions,
    finished: bool,
}

impl Tokenizer {
    pub fn new(source: &str, options: TokenizerOptions) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            options,
            finished: false,
        }
    }

    /// Tokenize a whole source string.
    pub fn tokenize(source: &str, options: TokenizerOptions) -> Vec<Token> {
        Self::new(source, options).collect()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.chars.get(self.pos - 1) == Some(&'\n')
    }

    fn skip_until(&mut self, terminator: &str, anchored: bool) {
        while self.peek(0).is_some() {
            if self.starts_with(terminator) && (!anchored || self.at_line_start()) {
                for _ in terminator.chars() {
                    self.bump();
                }
                return;
            }
            self.bump();
        }
    }

    /// Skip whitespace and comments. Returns false at end of input.
    fn skip_trivia(&mut self) -> bool {
        'outer: loop {
            let Some(c) = self.peek(0) else {
                return false;
            };
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            let anchored = self.options.anchored_block_comments;
            for (open, close) in self.options.block_comments {
                if self.starts_with(open) && (!anchored || self.at_line_start()) {
                    self.skip_until(close, anchored);
                    continue 'outer;
                }
            }
            for prefix in self.options.line_comments {
                if self.starts_with(prefix) {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue 'outer;
                }
            }
            return true;
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek(0) {
            if is_word_char(c) {
                word.push(c);
                self.bump();
            } else if c == '.'
                && self.options.dotted_words
                && self.peek(1).is_some_and(is_word_char)
            {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn read_quoted(&mut self, quote: char) -> String {
        let triple = self.options.triple_quotes
            && self.peek(1) == Some(quote)
            && self.peek(2) == Some(quote);
        let delimiter: String = if triple {
            std::iter::repeat(quote).take(3).collect()
        } else {
            quote.to_string()
        };
        for _ in 0..delimiter.chars().count() {
            self.bump();
        }

        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if self.starts_with(&delimiter) {
                for _ in 0..delimiter.chars().count() {
                    self.bump();
                }
                return text;
            }
            // Unterminated single-line strings stop at end of line.
            if c == '\n' && !triple {
                return text;
            }
            self.bump();
            if c == '\\' {
                match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('0') => text.push('\0'),
                    Some(e @ ('\\' | '"' | '\'')) => text.push(e),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => text.push('\\'),
                }
            } else {
                text.push(c);
            }
        }
        text
    }

    /// Body of a `@"..."` string, positioned on the `@`.
    fn read_verbatim(&mut self) -> String {
        self.bump();
        self.bump();
        let mut text = String::new();
        while let Some(c) = self.bump() {
            if c == '"' {
                if self.peek(0) == Some('"') {
                    self.bump();
                    text.push('"');
                    continue;
                }
                return text;
            }
            text.push(c);
        }
        text
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        if !self.skip_trivia() {
            self.finished = true;
            return Some(Token::new(TokenKind::Eof, self.line));
        }

        let line = self.line;
        let c = self.peek(0)?;
        let kind = if c == '@' && self.options.verbatim_strings && self.peek(1) == Some('"') {
            TokenKind::Quoted {
                quote: '"',
                text: self.read_verbatim(),
            }
        } else if is_word_char(c) {
            TokenKind::Word(self.read_word())
        } else if self.options.quote_chars.contains(&c) {
            TokenKind::Quoted {
                quote: c,
                text: self.read_quoted(c),
            }
        } else {
            self.bump();
            TokenKind::Punct(c)
        };
        Some(Token::new(kind, line))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
