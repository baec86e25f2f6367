//! Typed upload records.
//!
//! Parsed file rows become one of three record variants sharing a lemma
//! field. Records are transient: they are produced by the ingestion
//! pipeline and consumed by the merge/creation logic, never persisted
//! directly.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Sentinel judgment meaning "no value supplied". Rows carrying it touch
/// existing annotations' state only through sequence advancement.
pub const JUDGMENT_NONE: f32 = -1.0;

/// Lowest acceptable real judgment.
pub const JUDGMENT_MIN: f32 = 0.0;

/// Highest acceptable real judgment.
pub const JUDGMENT_MAX: f32 = 4.0;

/// Maximum comment length, matching the VARCHAR(255) column.
pub const MAX_COMMENT_LEN: usize = 255;

/// Whether a judgment value is acceptable on upload: the sentinel, or a
/// finite value within the 0..=4 scale.
pub fn is_valid_judgment(judgment: f32) -> bool {
    judgment == JUDGMENT_NONE
        || (judgment.is_finite() && (JUDGMENT_MIN..=JUDGMENT_MAX).contains(&judgment))
}

/// One row of a `uses.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseRecord {
    pub lemma: String,
    pub pos: String,
    pub date: String,
    pub grouping: String,
    /// External identifier, unique within the lemma.
    pub identifier: String,
    pub description: String,
    /// Context with legacy orthography already normalized.
    pub context: String,
    /// Target token span within the context.
    pub token_span: Span,
    /// Target sentence span within the context.
    pub sentence_span: Span,
}

/// One row of an `instances.csv` file: a curated pair of external use
/// identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub lemma: String,
    pub identifier1: String,
    pub identifier2: String,
}

impl InstanceRecord {
    /// Pair identity irrespective of column order.
    pub fn pair_key(&self) -> (String, String) {
        order_key(&self.identifier1, &self.identifier2)
    }
}

/// One row of an `annotations.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub lemma: String,
    pub identifier1: String,
    pub identifier2: String,
    pub annotator: String,
    pub judgment: f32,
    pub comment: String,
}

impl AnnotationRecord {
    /// Duplicate identity: annotator plus the unordered identifier pair.
    pub fn identity(&self) -> (String, String, String) {
        let (a, b) = order_key(&self.identifier1, &self.identifier2);
        (self.annotator.clone(), a, b)
    }
}

/// A parsed upload row. Exhaustively matched downstream; a parser is a
/// pure function from raw row to one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Use(UseRecord),
    Instance(InstanceRecord),
    Annotation(AnnotationRecord),
}

impl Record {
    /// The lemma field shared by all variants.
    pub fn lemma(&self) -> &str {
        match self {
            Record::Use(r) => &r.lemma,
            Record::Instance(r) => &r.lemma,
            Record::Annotation(r) => &r.lemma,
        }
    }

    pub fn as_use(&self) -> Option<&UseRecord> {
        match self {
            Record::Use(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRecord> {
        match self {
            Record::Instance(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationRecord> {
        match self {
            Record::Annotation(r) => Some(r),
            _ => None,
        }
    }
}

fn order_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn judgment_validity() {
        for j in [-1.0, 0.0, 1.0, 2.5, 4.0] {
            assert!(is_valid_judgment(j), "{j} should be valid");
        }
        for j in [-2.0, -0.5, 4.5, f32::NAN, f32::INFINITY] {
            assert!(!is_valid_judgment(j), "{j} should be invalid");
        }
    }

    #[test]
    fn annotation_identity_ignores_identifier_order() {
        let a = AnnotationRecord {
            lemma: "bank".into(),
            identifier1: "u1".into(),
            identifier2: "u2".into(),
            annotator: "anna".into(),
            judgment: 3.0,
            comment: String::new(),
        };
        let mut b = a.clone();
        b.identifier1 = "u2".into();
        b.identifier2 = "u1".into();
        b.judgment = 1.0;
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn instance_pair_key_is_unordered() {
        let r = InstanceRecord {
            lemma: "bank".into(),
            identifier1: "b".into(),
            identifier2: "a".into(),
        };
        assert_eq!(r.pair_key(), ("a".to_string(), "b".to_string()));
    }
}
