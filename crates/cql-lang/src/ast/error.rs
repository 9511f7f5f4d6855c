use thiserror::Error;

use crate::Token;

fn describe(token: &Token) -> String {
    if token.is_eof() {
        "EOF".to_string()
    } else {
        token.to_string()
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{}`", describe(.0))]
    UnexpectedToken(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected,
    #[error("Expected a closing bracket `]` but got `{}`", describe(.0))]
    ExpectedClosingBracket(Token),
    #[error("Expected a closing parenthesis `)` but got `{}`", describe(.0))]
    ExpectedClosingParen(Token),
    #[error("Expected a closing brace `}}` but got `{}`", describe(.0))]
    ExpectedClosingBrace(Token),
    #[error("Invalid repetition `{{{1},{2}}}`: the maximum is smaller than the minimum")]
    InvalidRepetition(Token, u32, u32),
    #[error("Negation is not supported")]
    UnsupportedNegation(Token),
    #[error("Expression nesting exceeds the maximum depth of {}", super::parser::MAX_NESTING_DEPTH)]
    NestingTooDeep(Token),
}

impl ParseError {
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::UnexpectedToken(token)
            | ParseError::ExpectedClosingBracket(token)
            | ParseError::ExpectedClosingParen(token)
            | ParseError::ExpectedClosingBrace(token)
            | ParseError::InvalidRepetition(token, _, _)
            | ParseError::UnsupportedNegation(token)
            | ParseError::NestingTooDeep(token) => Some(token),
            ParseError::UnexpectedEOFDetected => None,
        }
    }
}
