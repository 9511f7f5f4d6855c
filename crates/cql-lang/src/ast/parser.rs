use std::iter::Peekable;

use smol_str::SmolStr;

use crate::lexer::token::{Token, TokenKind};
use crate::range::Range;

use super::error::ParseError;
use super::node::{Attribute, BoolOp, CompareOp, Expr, Pattern, Repeat, Tag, TokenExpr, Within};

/// Deepest expression tree accepted, counting both parentheses and
/// operator chains.
pub const MAX_NESTING_DEPTH: usize = 256;

pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Token>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: core::slice::Iter<'a, Token>) -> Self {
        Self {
            tokens: tokens.peekable(),
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Pattern, ParseError> {
        let mut tokens = Vec::new();
        let mut within = None;

        loop {
            match self.peek_kind() {
                Some(TokenKind::Eof) | None => break,
                Some(TokenKind::Within) => {
                    within = Some(self.parse_within()?);
                    // The scope clause always closes the pattern.
                    let token = self.next_token()?;
                    if !token.is_eof() {
                        return Err(ParseError::UnexpectedToken(token.clone()));
                    }
                    break;
                }
                _ => tokens.push(self.parse_token_expr()?),
            }
        }

        if tokens.is_empty() && within.is_none() {
            return Err(ParseError::UnexpectedEOFDetected);
        }

        Ok(Pattern { tokens, within })
    }

    fn peek_kind(&mut self) -> Option<&'a TokenKind> {
        self.tokens.peek().copied().map(|token| &token.kind)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<&'a TokenKind> {
        self.tokens.clone().nth(n).map(|token| &token.kind)
    }

    fn next_token(&mut self) -> Result<&'a Token, ParseError> {
        self.tokens.next().ok_or(ParseError::UnexpectedEOFDetected)
    }

    fn expect(
        &mut self,
        matches: impl Fn(&TokenKind) -> bool,
        on_mismatch: impl Fn(Token) -> ParseError,
    ) -> Result<&'a Token, ParseError> {
        let token = self.next_token()?;

        if matches(&token.kind) {
            Ok(token)
        } else {
            Err(on_mismatch(token.clone()))
        }
    }

    fn expect_ident(&mut self) -> Result<(SmolStr, Range), ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::Ident(name) => Ok((name.clone(), token.range)),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn parse_token_expr(&mut self) -> Result<TokenExpr, ParseError> {
        let leading_tag = match self.peek_kind() {
            Some(TokenKind::Lt) => Some(self.parse_open_tag()?),
            _ => None,
        };

        let atom_token = self.next_token()?;
        let (expr, atom_range) = match &atom_token.kind {
            TokenKind::LBracket => self.parse_bracket(atom_token)?,
            TokenKind::StringLiteral(value) => (
                Some(Expr::Attribute(Attribute {
                    name: None,
                    op: CompareOp::Eq,
                    value: value.clone(),
                    range: atom_token.range,
                })),
                atom_token.range,
            ),
            TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
            _ => return Err(ParseError::UnexpectedToken(atom_token.clone())),
        };

        let mut range = leading_tag
            .as_ref()
            .map(|tag| tag.range.merge(&atom_range))
            .unwrap_or(atom_range);

        let repeat = match self.peek_kind() {
            Some(TokenKind::LBrace) | Some(TokenKind::Asterisk) | Some(TokenKind::Plus) => {
                let (repeat, repeat_range) = self.parse_repeat()?;
                range = range.merge(&repeat_range);
                Some(repeat)
            }
            _ => None,
        };

        let optional = match self.peek_kind() {
            Some(TokenKind::Question) => {
                let token = self.next_token()?;
                range = range.merge(&token.range);
                true
            }
            _ => false,
        };

        let trailing_tag = match (self.peek_kind(), self.peek_nth_kind(1)) {
            (Some(TokenKind::Lt), Some(TokenKind::Slash)) => {
                let tag = self.parse_close_tag()?;
                range = range.merge(&tag.range);
                Some(tag)
            }
            _ => None,
        };

        Ok(TokenExpr {
            leading_tag,
            expr,
            repeat,
            optional,
            trailing_tag,
            range,
        })
    }

    fn parse_bracket(
        &mut self,
        l_bracket: &'a Token,
    ) -> Result<(Option<Expr>, Range), ParseError> {
        if let Some(TokenKind::RBracket) = self.peek_kind() {
            let r_bracket = self.next_token()?;
            return Ok((None, l_bracket.range.merge(&r_bracket.range)));
        }

        let (expr, _) = self.parse_or()?;
        let r_bracket = self.expect(
            |kind| matches!(kind, TokenKind::RBracket),
            ParseError::ExpectedClosingBracket,
        )?;

        Ok((Some(expr), l_bracket.range.merge(&r_bracket.range)))
    }

    // The expression parsers return the height of the tree they built.
    fn parse_or(&mut self) -> Result<(Expr, usize), ParseError> {
        let (mut lhs, mut height) = self.parse_and()?;

        while let Some(TokenKind::Or) = self.peek_kind() {
            let op = self.next_token()?;
            let (rhs, rhs_height) = self.parse_and()?;
            height = grow(op, height.max(rhs_height))?;
            lhs = Expr::binary(BoolOp::Or, lhs, rhs);
        }

        Ok((lhs, height))
    }

    fn parse_and(&mut self) -> Result<(Expr, usize), ParseError> {
        let (mut lhs, mut height) = self.parse_primary()?;

        while let Some(TokenKind::And) = self.peek_kind() {
            let op = self.next_token()?;
            let (rhs, rhs_height) = self.parse_primary()?;
            height = grow(op, height.max(rhs_height))?;
            lhs = Expr::binary(BoolOp::And, lhs, rhs);
        }

        Ok((lhs, height))
    }

    fn parse_primary(&mut self) -> Result<(Expr, usize), ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::LParen => {
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(ParseError::NestingTooDeep(token.clone()));
                }

                self.depth += 1;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;

                self.expect(
                    |kind| matches!(kind, TokenKind::RParen),
                    ParseError::ExpectedClosingParen,
                )?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self
                .parse_attribute(name.clone(), token.range)
                .map(|expr| (expr, 0)),
            TokenKind::Not => Err(ParseError::UnsupportedNegation(token.clone())),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn parse_attribute(&mut self, name: SmolStr, name_range: Range) -> Result<Expr, ParseError> {
        let op_token = self.next_token()?;
        let op = match &op_token.kind {
            TokenKind::Equal => CompareOp::Eq,
            TokenKind::NeEq => CompareOp::Ne,
            TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
            _ => return Err(ParseError::UnexpectedToken(op_token.clone())),
        };

        let value_token = self.next_token()?;
        match &value_token.kind {
            TokenKind::StringLiteral(value) => Ok(Expr::Attribute(Attribute {
                name: Some(name),
                op,
                value: value.clone(),
                range: name_range.merge(&value_token.range),
            })),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken(value_token.clone())),
        }
    }

    fn parse_repeat(&mut self) -> Result<(Repeat, Range), ParseError> {
        let first = self.next_token()?;

        match &first.kind {
            TokenKind::Asterisk => return Ok((Repeat { min: 0, max: None }, first.range)),
            TokenKind::Plus => return Ok((Repeat { min: 1, max: None }, first.range)),
            _ => {}
        }

        let min = self.parse_number()?;
        let max = match self.peek_kind() {
            Some(TokenKind::Comma) => {
                self.next_token()?;
                match self.peek_kind() {
                    Some(TokenKind::NumberLiteral(_)) => Some(self.parse_number()?),
                    _ => None,
                }
            }
            _ => Some(min),
        };

        let r_brace = self.expect(
            |kind| matches!(kind, TokenKind::RBrace),
            ParseError::ExpectedClosingBrace,
        )?;

        if let Some(max) = max.filter(|max| *max < min) {
            return Err(ParseError::InvalidRepetition(first.clone(), min, max));
        }

        Ok((Repeat { min, max }, first.range.merge(&r_brace.range)))
    }

    fn parse_number(&mut self) -> Result<u32, ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::NumberLiteral(n) => Ok(*n),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    // `<name>`
    fn parse_open_tag(&mut self) -> Result<Tag, ParseError> {
        let lt = self.next_token()?;
        let (name, _) = self.expect_ident()?;
        let gt = self.expect(
            |kind| matches!(kind, TokenKind::Gt),
            ParseError::UnexpectedToken,
        )?;

        Ok(Tag {
            name,
            range: lt.range.merge(&gt.range),
        })
    }

    // `</name>`
    fn parse_close_tag(&mut self) -> Result<Tag, ParseError> {
        let lt = self.next_token()?;
        self.expect(
            |kind| matches!(kind, TokenKind::Slash),
            ParseError::UnexpectedToken,
        )?;
        let (name, _) = self.expect_ident()?;
        let gt = self.expect(
            |kind| matches!(kind, TokenKind::Gt),
            ParseError::UnexpectedToken,
        )?;

        Ok(Tag {
            name,
            range: lt.range.merge(&gt.range),
        })
    }

    // `within <name/>`, the name may be omitted.
    fn parse_within(&mut self) -> Result<Within, ParseError> {
        let within = self.next_token()?;
        self.expect(|kind| matches!(kind, TokenKind::Lt), ParseError::UnexpectedToken)?;

        let element = match self.peek_kind() {
            Some(TokenKind::Ident(_)) => self.expect_ident()?.0,
            _ => SmolStr::default(),
        };

        self.expect(
            |kind| matches!(kind, TokenKind::Slash),
            ParseError::UnexpectedToken,
        )?;
        let gt = self.expect(|kind| matches!(kind, TokenKind::Gt), ParseError::UnexpectedToken)?;

        Ok(Within {
            element,
            range: within.range.merge(&gt.range),
        })
    }
}

fn grow(op: &Token, height: usize) -> Result<usize, ParseError> {
    if height >= MAX_NESTING_DEPTH {
        Err(ParseError::NestingTooDeep(op.clone()))
    } else {
        Ok(height + 1)
    }
}
