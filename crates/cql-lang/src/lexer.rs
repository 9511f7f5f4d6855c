pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace0},
    combinator::{consumed, map, map_res, recognize},
    multi::many0,
    sequence::{delimited, pair, terminated},
};
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

/// Splits query text into tokens, terminated by a single `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    match tokens(Span::new(input)) {
        Ok((rest, tokens)) if rest.fragment().is_empty() => {
            let eof: Range = rest.into();
            Ok([tokens, vec![Token::new(TokenKind::Eof, eof)]].concat())
        }
        Ok((rest, _)) => Err(unexpected(rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(unexpected(e.input)),
        Err(nom::Err::Incomplete(_)) => unreachable!(),
    }
}

fn unexpected(rest: Span) -> LexerError {
    let start: Position = rest.into();

    match rest.fragment().chars().next().unwrap_or_default() {
        '"' | '\'' => LexerError::UnterminatedString(rest.into()),
        c => LexerError::UnexpectedCharacter(
            c,
            Range::new(start, Position::new(start.line, start.column + 1)),
        ),
    }
}

define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(and, "&", TokenKind::And);
define_token_parser!(or, "|", TokenKind::Or);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(not, "!", TokenKind::Not);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(plus, "+", TokenKind::Plus);

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        l_bracket, r_bracket, l_paren, r_paren, l_brace, r_brace, and, or, ne_eq, not, equal, lt,
        gt, slash, comma, question, asterisk, plus,
    ))
    .parse(input)
}

// Backslashes are regex text except in a run that precedes the quote or
// ends the literal, where each pair stands for one backslash.
fn unescape(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let mut run = 1;
        while chars.next_if_eq(&'\\').is_some() {
            run += 1;
        }

        match chars.peek() {
            Some(&next) if next == quote => {
                out.extend(std::iter::repeat_n('\\', run / 2));
                out.push(quote);
                chars.next();
            }
            None => out.extend(std::iter::repeat_n('\\', run / 2)),
            Some(_) => out.extend(std::iter::repeat_n('\\', run)),
        }
    }

    out
}

fn quoted(input: Span, quote: char) -> IResult<Span, Token> {
    let stop = if quote == '"' { "\"\\" } else { "'\\" };

    map(
        consumed(delimited(
            char(quote),
            recognize(many0(alt((
                recognize(pair(char('\\'), anychar)),
                is_not(stop),
            )))),
            char(quote),
        )),
        |(literal, body): (Span, Span)| Token {
            range: literal.into(),
            kind: TokenKind::StringLiteral(unescape(body.fragment(), quote)),
        },
    )
    .parse(input)
}

fn double_quoted(input: Span) -> IResult<Span, Token> {
    quoted(input, '"')
}

fn single_quoted(input: Span) -> IResult<Span, Token> {
    quoted(input, '\'')
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    alt((double_quoted, single_quoted)).parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(digit1, |span: Span| {
        span.fragment().parse::<u32>().map(|n| Token {
            range: span.into(),
            kind: TokenKind::NumberLiteral(n),
        })
    })
    .parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_"), tag("-")))),
        )),
        |span: Span| {
            let kind = match *span.fragment() {
                "within" => TokenKind::Within,
                name => TokenKind::Ident(SmolStr::new(name)),
            };
            Token {
                range: span.into(),
                kind,
            }
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((punctuations, string_literal, number_literal, ident)).parse(input)
}

fn tokens(input: Span) -> IResult<Span, Vec<Token>> {
    terminated(
        many0(delimited(multispace0, token, multispace0)),
        multispace0,
    )
    .parse(input)
}
