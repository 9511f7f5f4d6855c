use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Prefix marking a value as case-sensitive.
pub const CASE_MARKER: &str = "(?-i)";
/// Older spelling of [`CASE_MARKER`], accepted when reading queries.
pub const CASE_MARKER_COMPAT: &str = "(?c)";
pub const WILDCARD: &str = ".*";
pub const ALTERNATION: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparator {
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
}

impl Comparator {
    pub const ALL: [Comparator; 4] = [
        Comparator::Equals,
        Comparator::NotEquals,
        Comparator::StartsWith,
        Comparator::EndsWith,
    ];

    /// The comparison operator written into query text.
    pub fn as_cql(&self) -> &'static str {
        match self {
            Comparator::NotEquals => "!=",
            _ => "=",
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Comparator::Equals => write!(f, "="),
            Comparator::NotEquals => write!(f, "!="),
            Comparator::StartsWith => write!(f, "starts with"),
            Comparator::EndsWith => write!(f, "ends with"),
        }
    }
}

/// A single attribute test on a token, e.g. `lemma starts with "run"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: SmolStr,
    pub comparator: Comparator,
    pub case_sensitive: bool,
    pub values: Vec<String>,
}

impl Predicate {
    pub fn new(field: impl Into<SmolStr>, comparator: Comparator, value: &str) -> Self {
        let mut predicate = Self::empty(field);
        predicate.comparator = comparator;
        predicate.set_value(value);
        predicate
    }

    pub fn empty(field: impl Into<SmolStr>) -> Self {
        Self {
            field: field.into(),
            comparator: Comparator::Equals,
            case_sensitive: false,
            values: Vec::new(),
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }

    /// Replaces the values with a single one; an empty string clears them.
    pub fn set_value(&mut self, value: &str) {
        self.values = if value.is_empty() {
            Vec::new()
        } else {
            vec![value.to_string()]
        };
    }

    /// An empty predicate serializes to nothing and is skipped by its group.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|value| value.is_empty())
    }
}

/// Splits pasted bulk text into one value per non-blank line.
pub fn values_from_list(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
