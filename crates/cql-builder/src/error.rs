use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use thiserror::Error;

use crate::{NodeId, TokenId, predicate::Comparator};

/// Misuse of the editing API. The model is left unchanged when one of these
/// is returned.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BuilderError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("Unknown token {0:?}")]
    UnknownToken(TokenId),
    #[error("Node {0:?} is not a group")]
    NotAGroup(NodeId),
    #[error("Node {0:?} is not a predicate")]
    NotAPredicate(NodeId),
    #[error("Anchor {anchor:?} is not a child of group {group:?}")]
    AnchorNotChild { anchor: NodeId, group: NodeId },
    #[error("Node {0:?} is already attached to a group")]
    AlreadyAttached(NodeId),
    #[error("The root group {0:?} of a token cannot be removed or relocated")]
    RootGroup(NodeId),
    #[error("Cannot move {node:?} into {target:?}, which is inside it")]
    CyclicMove { node: NodeId, target: NodeId },
    #[error("A group needs at least two children, got {0}")]
    TooFewChildren(usize),
    #[error("Token index {index} is out of range for {len} tokens")]
    TokenIndexOutOfRange { index: usize, len: usize },
    #[error("Invalid repeat range {{{min},{max}}}: the maximum is smaller than the minimum")]
    InvalidRepeat { min: u32, max: u32 },
    #[error("Unknown field `{0}`")]
    UnknownField(SmolStr),
    #[error("Field `{field}` does not allow the `{comparator}` comparator")]
    DisallowedComparator {
        field: SmolStr,
        comparator: Comparator,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Settings must declare at least one field")]
    NoFields,
    #[error("Field `{0}` is declared more than once")]
    DuplicateField(SmolStr),
    #[error("Field `{0}` does not allow any comparator")]
    NoComparators(SmolStr),
}

/// Text that is valid syntax but cannot be represented by the model.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConstraintError {
    #[error("Unknown field `{0}`")]
    UnknownField(SmolStr),
    #[error("Field `{field}` does not allow the `{comparator}` comparator")]
    DisallowedComparator {
        field: SmolStr,
        comparator: Comparator,
    },
    #[error("Unsupported element `<{0}>`, only sentence boundaries are supported")]
    UnsupportedTag(SmolStr),
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error(transparent)]
    Syntax(Box<cql_lang::Error>),
    #[error("{cause}")]
    Constraint {
        cause: ConstraintError,
        source_code: String,
        location: SourceSpan,
    },
}

impl From<cql_lang::Error> for ParseFailure {
    fn from(err: cql_lang::Error) -> Self {
        ParseFailure::Syntax(Box::new(err))
    }
}

impl ParseFailure {
    pub(crate) fn constraint(
        source_code: &str,
        range: &cql_lang::Range,
        cause: impl Into<ConstraintError>,
    ) -> Self {
        ParseFailure::Constraint {
            cause: cause.into(),
            source_code: source_code.to_string(),
            location: cql_lang::source_span(source_code, range),
        }
    }
}

impl Diagnostic for ParseFailure {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ParseFailure::Syntax(err) => err.code(),
            ParseFailure::Constraint { cause, .. } => {
                let c = match cause {
                    ConstraintError::UnknownField(_) => "ConstraintError::UnknownField",
                    ConstraintError::DisallowedComparator { .. } => {
                        "ConstraintError::DisallowedComparator"
                    }
                    ConstraintError::UnsupportedTag(_) => "ConstraintError::UnsupportedTag",
                    ConstraintError::Builder(_) => "ConstraintError::Builder",
                };
                Some(Box::new(c))
            }
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ParseFailure::Syntax(err) => err.help(),
            ParseFailure::Constraint { cause, .. } => {
                let msg = match cause {
                    ConstraintError::UnknownField(_) => {
                        Some("Only fields listed in the settings can be queried.".to_string())
                    }
                    ConstraintError::UnsupportedTag(_) => {
                        Some("Use `<s>` and `</s>` to anchor a token at a sentence boundary.".to_string())
                    }
                    _ => None,
                };
                msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
            }
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        match self {
            ParseFailure::Syntax(err) => err.labels(),
            ParseFailure::Constraint {
                cause, location, ..
            } => Some(Box::new(std::iter::once(
                miette::LabeledSpan::new_with_span(Some(cause.to_string()), *location),
            ))),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            ParseFailure::Syntax(err) => Some(&err.source_code),
            ParseFailure::Constraint { source_code, .. } => Some(source_code),
        }
    }
}

/// A structural invariant found broken by [`crate::Query::check_invariants`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InvariantViolation {
    #[error("Group {0:?} is not a root group but has {1} children")]
    UndersizedGroup(NodeId, usize),
    #[error("Node {child:?} does not point back to its parent {parent:?}")]
    ParentMismatch { parent: NodeId, child: NodeId },
    #[error("Node {0:?} appears more than once in the tree")]
    SharedNode(NodeId),
    #[error("Token {0:?} does not own a root group")]
    MissingRoot(TokenId),
    #[error("Node {0:?} is referenced but does not exist")]
    DanglingNode(NodeId),
}
