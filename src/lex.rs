//! Tokenizer for the term syntax. Every token keeps a [`Span`] into the
//! operand it came from so that errors can point at the offending text.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A named piece of input, usually one command-line operand.
#[derive(Debug)]
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// One-based line and column (in chars) of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let before = &self.text[..offset.min(self.text.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        (line, before[line_start..].chars().count() + 1)
    }

    pub fn line_text(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|index| self.text.lines().nth(index))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    source: Arc<Source>,
    range: Range<usize>,
}

impl Span {
    pub fn new(source: Arc<Source>, range: Range<usize>) -> Self {
        Span { source, range }
    }

    /// The empty span just past the last byte of `source`.
    pub fn end_of(source: Arc<Source>) -> Self {
        let end = source.text().len();
        Span::new(source, end..end)
    }

    pub fn text(&self) -> &str {
        self.source.text().get(self.range.clone()).unwrap_or_default()
    }
}

// name:line:col, then the line, then carets under the span
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, column) = self.source.line_column(self.range.start);
        writeln!(f, "{}:{}:{}", self.source.name(), line, column)?;
        writeln!(f, "{}", self.source.line_text(line))?;
        let width = self.text().chars().count().max(1);
        write!(f, "{}{}", " ".repeat(column - 1), "^".repeat(width))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Var,   // $0, $12
    Ident, // f, ConceptNode, 42
    Punct, // ( ) { }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text(&self) -> &str {
        self.span.text()
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text() == punct
    }
}

#[derive(Debug, Clone, Error)]
#[error("unrecognizable character at {span}")]
pub struct LexError {
    span: Span,
}

#[derive(Debug, Clone)]
pub struct Lex {
    source: Arc<Source>,
    pos: usize,
}

impl Lex {
    pub fn new(source: Arc<Source>) -> Self {
        Lex { source, pos: 0 }
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    fn error_here(&self) -> LexError {
        let width = self.source.text()[self.pos..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        LexError {
            span: Span::new(Arc::clone(&self.source), self.pos..self.pos + width),
        }
    }
}

impl Iterator for Lex {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        static TOKEN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(concat!(
                r"^(?:(?P<space>\s+|;.*)",
                r"|(?P<var>\$[0-9]+)",
                r"|(?P<punct>[(){}])",
                r"|(?P<ident>[^\s(){};$][^\s(){};]*))",
            ))
            .expect("valid token regex")
        });

        loop {
            let rest = &self.source.text()[self.pos..];
            if rest.is_empty() {
                return None;
            }
            let Some(cap) = TOKEN.captures(rest) else {
                return Some(Err(self.error_here()));
            };
            let start = self.pos;
            self.pos += cap[0].len();

            let kind = if cap.name("space").is_some() {
                continue;
            } else if cap.name("var").is_some() {
                TokenKind::Var
            } else if cap.name("punct").is_some() {
                TokenKind::Punct
            } else {
                TokenKind::Ident
            };
            let span = Span::new(Arc::clone(&self.source), start..self.pos);
            return Some(Ok(Token { kind, span }));
        }
    }
}

impl FusedIterator for Lex {}
