//! `cql-lang` tokenizes and parses the bracketed token-pattern syntax of
//! the Corpus Query Language into a small AST.
//!
//! ## Examples
//!
//! ```rust
//! let pattern = cql_lang::parse("[word=\"house\" & pos=\"N.*\"] within <s/>").unwrap();
//!
//! assert_eq!(pattern.tokens.len(), 1);
//! assert_eq!(pattern.within.map(|w| w.element.to_string()), Some("s".to_string()));
//! ```
mod ast;
mod error;
mod lexer;
mod range;

pub use ast::error::ParseError;
pub use ast::node::{
    Attribute as AstAttribute, BoolOp, CompareOp, Expr as AstExpr, Pattern, Repeat, Tag,
    TokenExpr, Within,
};
pub use ast::parser::{MAX_NESTING_DEPTH, Parser};
pub use error::{Error, InnerError, source_span};
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use range::{Position, Range};

/// Tokenizes `code`, wrapping failures in a diagnostic [`Error`].
pub fn tokenize(code: &str) -> Result<Vec<Token>, Error> {
    lexer::tokenize(code).map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

/// Parses a whole query into a [`Pattern`].
pub fn parse(code: &str) -> Result<Pattern, Error> {
    let tokens = tokenize(code)?;
    Parser::new(tokens.iter())
        .parse()
        .map_err(|e| Error::from_error(code, InnerError::Parse(e)))
}
