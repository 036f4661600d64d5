//! Reader for the textual term syntax:
//!
//! ```text
//! term        ::= $<digits> | ident | ( ident term* )
//! conjunction ::= { term* }
//! ```
//!
//! `(f)` reads as the leaf `f`, so printing and reading agree on every term
//! without atom leaves.

use std::sync::Arc;

use thiserror::Error;

use crate::lex::{Lex, LexError, Source, Span, Token, TokenKind};
use crate::tree::{mk_leaf, mk_node, Conjunction, Symbol, Term, Var};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tokenize error")]
    Lex {
        #[from]
        lex_error: LexError,
    },
    #[error("parse error: {message} at {span}")]
    Parse {
        message: String,
        span: String,
    },
    #[error("unexpected end of input at {span}")]
    Eof { span: String },
}

pub struct Parser<'a> {
    lex: &'a mut Lex,
}

impl<'a> Parser<'a> {
    pub fn new(lex: &'a mut Lex) -> Self {
        Self { lex }
    }

    fn fail<R>(token: Token, message: impl Into<String>) -> Result<R, ParseError> {
        Err(ParseError::Parse {
            message: message.into(),
            span: token.span.to_string(),
        })
    }

    fn eof_error(&self) -> ParseError {
        ParseError::Eof {
            span: Span::end_of(Arc::clone(self.lex.source())).to_string(),
        }
    }

    fn peek(&mut self) -> Result<Option<Token>, ParseError> {
        Ok(self.lex.clone().next().transpose()?)
    }

    fn any_token(&mut self) -> Result<Token, ParseError> {
        self.lex.next().transpose()?.ok_or_else(|| self.eof_error())
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), ParseError> {
        let token = self.any_token()?;
        if token.is_punct(sym) {
            return Ok(());
        }
        Self::fail(token, format!("expected symbol '{}'", sym))
    }

    fn is_punct_next(&mut self, sym: &str) -> Result<bool, ParseError> {
        Ok(self
            .peek()?
            .is_some_and(|token| token.is_punct(sym)))
    }

    pub fn eof(&mut self) -> Result<(), ParseError> {
        if let Some(token) = self.peek()? {
            Self::fail(token, "expected EOF but tokens remain")?;
        }
        Ok(())
    }

    fn symbol(&mut self, token: Token) -> Result<Symbol, ParseError> {
        match Symbol::intern(token.text()) {
            Ok(symbol) => Ok(symbol),
            Err(e) => Self::fail(token, e.to_string()),
        }
    }

    fn var(&mut self, token: Token) -> Result<Var, ParseError> {
        match token.text()[1..].parse::<usize>() {
            Ok(id) => Ok(Var::new(id)),
            Err(_) => Self::fail(token, "variable index out of range"),
        }
    }

    pub fn term(&mut self) -> Result<Term, ParseError> {
        let token = self.any_token()?;
        match token.kind {
            TokenKind::Var => Ok(Term::Var(self.var(token)?)),
            TokenKind::Ident => Ok(mk_leaf(self.symbol(token)?)),
            TokenKind::Punct if token.text() == "(" => {
                let head = self.any_token()?;
                if head.kind != TokenKind::Ident {
                    return Self::fail(head, "expected label");
                }
                let label = self.symbol(head)?;
                let mut args = vec![];
                while !self.is_punct_next(")")? {
                    args.push(self.term()?);
                }
                self.expect_symbol(")")?;
                Ok(mk_node(label, args))
            }
            TokenKind::Punct => Self::fail(token, "expected term"),
        }
    }

    pub fn conjunction(&mut self) -> Result<Conjunction, ParseError> {
        self.expect_symbol("{")?;
        let mut terms = vec![];
        while !self.is_punct_next("}")? {
            terms.push(self.term()?);
        }
        self.expect_symbol("}")?;
        Ok(Conjunction::new(terms))
    }
}

pub fn parse_term(name: &str, input: &str) -> Result<Term, ParseError> {
    let mut lex = Lex::new(Arc::new(Source::new(name, input)));
    let mut parser = Parser::new(&mut lex);
    let term = parser.term()?;
    parser.eof()?;
    Ok(term)
}

pub fn parse_conjunction(name: &str, input: &str) -> Result<Conjunction, ParseError> {
    let mut lex = Lex::new(Arc::new(Source::new(name, input)));
    let mut parser = Parser::new(&mut lex);
    let conj = parser.conjunction()?;
    parser.eof()?;
    Ok(conj)
}
