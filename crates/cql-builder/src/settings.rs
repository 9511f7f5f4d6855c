//! Field registry and builder defaults, loadable from TOML.
//!
//! ```toml
//! root_operator = "and"
//!
//! [[fields]]
//! name = "word"
//! case_sensitive = true
//!
//! [[fields]]
//! name = "pos"
//! label = "Part of speech"
//! comparators = ["equals", "not-equals"]
//! ```
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{error::ConfigError, node::Operator, predicate::Comparator};

fn all_comparators() -> Vec<Comparator> {
    Comparator::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: SmolStr,
    #[serde(default)]
    pub label: Option<String>,
    /// Whether values of this field may carry the case-sensitivity marker.
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "all_comparators")]
    pub comparators: Vec<Comparator>,
}

impl FieldSpec {
    pub fn new(name: impl Into<SmolStr>, case_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            label: None,
            case_sensitive,
            comparators: all_comparators(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.name.as_str())
    }

    pub fn allows(&self, comparator: Comparator) -> bool {
        self.comparators.contains(&comparator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Operator of a fresh token's root group.
    pub root_operator: Operator,
    /// Queryable fields; the first one is the default for new predicates.
    pub fields: Vec<FieldSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_operator: Operator::And,
            fields: vec![
                FieldSpec::new("word", true),
                FieldSpec::new("lemma", true),
                FieldSpec::new("pos", false).with_label("Part of speech"),
            ],
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading settings from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }

        if let Some(field) = self.fields.iter().map(|f| &f.name).duplicates().next() {
            return Err(ConfigError::DuplicateField(field.clone()));
        }

        match self.fields.iter().find(|f| f.comparators.is_empty()) {
            Some(field) => Err(ConfigError::NoComparators(field.name.clone())),
            None => Ok(()),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn default_field(&self) -> Option<&FieldSpec> {
        self.fields.first()
    }

    pub fn supports_case(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.case_sensitive)
    }

    pub fn allows(&self, name: &str, comparator: Comparator) -> bool {
        self.field(name).is_some_and(|f| f.allows(comparator))
    }
}
