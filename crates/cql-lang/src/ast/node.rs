use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

/// Boolean combinator between attribute tests inside one token.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash, Default)]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

impl Display for BoolOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            BoolOp::And => write!(f, "&"),
            BoolOp::Or => write!(f, "|"),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "!="),
        }
    }
}

/// A single `name op "value"` test. `name` is `None` for the bare
/// `"value"` token shorthand, which targets the default field.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Attribute {
    pub name: Option<SmolStr>,
    pub op: CompareOp,
    pub value: String,
    pub range: Range,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Expr {
    Binary {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Attribute(Attribute),
}

impl Expr {
    pub fn binary(op: BoolOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Repeat {
    pub min: u32,
    pub max: Option<u32>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Tag {
    pub name: SmolStr,
    pub range: Range,
}

/// One bracketed token position, e.g. `<s> [word="a"]{1,2}? </s>`.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct TokenExpr {
    pub leading_tag: Option<Tag>,
    pub expr: Option<Expr>,
    pub repeat: Option<Repeat>,
    pub optional: bool,
    pub trailing_tag: Option<Tag>,
    pub range: Range,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Within {
    pub element: SmolStr,
    pub range: Range,
}

#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Pattern {
    pub tokens: Vec<TokenExpr>,
    pub within: Option<Within>,
}
