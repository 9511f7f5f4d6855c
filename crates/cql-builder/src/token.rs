use crate::{NodeId, error::BuilderError};

slotmap::new_key_type! { pub struct TokenId; }

/// One bracketed position of the pattern. The token owns its root group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    root: NodeId,
    optional: bool,
    sentence_start: bool,
    sentence_end: bool,
    repeat_min: Option<u32>,
    repeat_max: Option<u32>,
}

impl Token {
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            root,
            optional: false,
            sentence_start: false,
            sentence_end: false,
            repeat_min: None,
            repeat_max: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    pub fn sentence_start(&self) -> bool {
        self.sentence_start
    }

    pub fn set_sentence_start(&mut self, sentence_start: bool) {
        self.sentence_start = sentence_start;
    }

    pub fn sentence_end(&self) -> bool {
        self.sentence_end
    }

    pub fn set_sentence_end(&mut self, sentence_end: bool) {
        self.sentence_end = sentence_end;
    }

    /// The repeat range as entered, before any defaulting.
    pub fn repeat(&self) -> (Option<u32>, Option<u32>) {
        (self.repeat_min, self.repeat_max)
    }

    /// Sets the repeat range. A missing minimum counts as 0 and a missing or
    /// zero maximum as unbounded, so `{0}` cannot be expressed.
    pub fn set_repeat(&mut self, min: Option<u32>, max: Option<u32>) -> Result<(), BuilderError> {
        match (min.unwrap_or(0), max.filter(|max| *max != 0)) {
            (min, Some(max)) if max < min => Err(BuilderError::InvalidRepeat { min, max }),
            _ => {
                self.repeat_min = min;
                self.repeat_max = max;
                Ok(())
            }
        }
    }

    /// `(min, max)` after defaulting, `None` when no range was entered.
    pub fn repeat_bounds(&self) -> Option<(u32, Option<u32>)> {
        if self.repeat_min.is_none() && self.repeat_max.is_none() {
            return None;
        }

        Some((
            self.repeat_min.unwrap_or(0),
            self.repeat_max.filter(|max| *max != 0),
        ))
    }

    /// The quantifier suffix written after the closing bracket.
    pub fn quantifier(&self) -> Option<String> {
        match self.repeat_bounds()? {
            (min, None) => Some(format!("{{{min},}}")),
            (min, Some(max)) if min < max => Some(format!("{{{min},{max}}}")),
            (min, Some(max)) if min == max && min != 1 => Some(format!("{{{min}}}")),
            _ => None,
        }
    }
}
