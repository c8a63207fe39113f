//! Category labels matched to model output positions.
//!
//! Index `i` of a model's output vector is the score for label `i`. The set is
//! validated once at construction and is immutable afterwards.

use std::collections::HashSet;

use thiserror::Error;

/// The six scene categories the bundled network is trained on, in output order.
pub const SCENE_LABELS: [&str; 6] = ["buildings", "forest", "glacier", "mountain", "sea", "street"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("label set is empty")]
    Empty,

    #[error("blank label at position {0}")]
    Blank(usize),

    #[error("duplicate label: {0}")]
    Duplicate(String),

    #[error("model produced {actual} scores but {expected} labels are configured")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Ordered, fixed sequence of category names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Build a label set, rejecting empty sets, blank names and duplicates.
    pub fn new<I, S>(names: I) -> Result<Self, LabelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(LabelError::Blank(i));
            }
            if !seen.insert(name.as_str()) {
                return Err(LabelError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// The hard-wired scene label set ([`SCENE_LABELS`]).
    pub fn scenes() -> Self {
        Self {
            names: SCENE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of labels, which must equal the model's output width.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Check that a model output of `width` scores lines up with this set.
    pub fn check_width(&self, width: usize) -> Result<(), LabelError> {
        if width == self.names.len() {
            Ok(())
        } else {
            Err(LabelError::WidthMismatch {
                expected: self.names.len(),
                actual: width,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenes_in_output_order() {
        let labels = LabelSet::scenes();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels.get(0), Some("buildings"));
        assert_eq!(labels.get(2), Some("glacier"));
        assert_eq!(labels.get(5), Some("street"));
        assert_eq!(labels.get(6), None);
    }

    #[test]
    fn scenes_pass_validation() {
        let validated = LabelSet::new(SCENE_LABELS).unwrap();
        assert_eq!(validated, LabelSet::scenes());
    }

    #[test]
    fn rejects_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(LabelSet::new(empty), Err(LabelError::Empty));
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(LabelSet::new(["sea", "  "]), Err(LabelError::Blank(1)));
    }

    #[test]
    fn rejects_duplicate() {
        assert_eq!(
            LabelSet::new(["sea", "forest", "sea"]),
            Err(LabelError::Duplicate("sea".into()))
        );
    }

    #[test]
    fn width_check() {
        let labels = LabelSet::scenes();
        assert!(labels.check_width(6).is_ok());
        assert_eq!(
            labels.check_width(5),
            Err(LabelError::WidthMismatch {
                expected: 6,
                actual: 5
            })
        );
    }
}
