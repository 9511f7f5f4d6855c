use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{ast::error::ParseError, lexer::error::LexerError, range::Range};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The query text the error was found in.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();
        let range = match &cause {
            InnerError::Lexer(err) => Some(err.range()),
            InnerError::Parse(err) => err.token().filter(|token| !token.is_eof()).map(|token| token.range),
        };

        let location = match range {
            Some(range) => source_span(&source_code, &range),
            None => eof_span(&source_code),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

}

/// Converts a line/column range into a byte span over `source_code`.
pub fn source_span(source_code: &str, range: &Range) -> SourceSpan {
    let start = SourceOffset::from_location(source_code, range.start.line as usize, range.start.column);
    let end = SourceOffset::from_location(source_code, range.end.line as usize, range.end.column);

    SourceSpan::new(start, std::cmp::max(end.offset().saturating_sub(start.offset()), 1))
}

fn eof_span(source_code: &str) -> SourceSpan {
    SourceSpan::new(SourceOffset::from(source_code.len()), 0)
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(_, _)) => "LexerError::UnexpectedCharacter",
            InnerError::Lexer(LexerError::UnterminatedString(_)) => "LexerError::UnterminatedString",
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => "ParseError::UnexpectedEOFDetected",
            InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => "ParseError::ExpectedClosingBracket",
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => "ParseError::ExpectedClosingParen",
            InnerError::Parse(ParseError::ExpectedClosingBrace(_)) => "ParseError::ExpectedClosingBrace",
            InnerError::Parse(ParseError::InvalidRepetition(_, _, _)) => "ParseError::InvalidRepetition",
            InnerError::Parse(ParseError::UnsupportedNegation(_)) => "ParseError::UnsupportedNegation",
            InnerError::Parse(ParseError::NestingTooDeep(_)) => "ParseError::NestingTooDeep",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(_, _)) => {
                Some("Field values must be quoted, e.g. [word=\"house\"].".to_string())
            }
            InnerError::Lexer(LexerError::UnterminatedString(_)) => {
                Some("Close the string with the same quote character it was opened with.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => Some(
                "Input ended unexpectedly. Check for missing closing brackets or incomplete attributes."
                    .to_string(),
            ),
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Parse(ParseError::InvalidRepetition(_, min, max)) => {
                Some(format!("Did you mean {{{max},{min}}}?"))
            }
            InnerError::Parse(ParseError::UnsupportedNegation(_)) => {
                Some("Use `!=` on the attribute instead of negating an expression.".to_string())
            }
            InnerError::Parse(ParseError::NestingTooDeep(_)) => {
                Some("Remove redundant parentheses or split the expression across tokens.".to_string())
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}
