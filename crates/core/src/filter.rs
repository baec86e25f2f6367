//! Typed filter specification for annotation queries.
//!
//! Replaces runtime property-path reflection with an explicit value
//! object enumerating the recognized fields and their match semantics.
//! The repository layer compiles this into SQL predicates.

use crate::types::DbId;

/// Which annotations to select. Every field is optional; `None` means
/// "no constraint". All present constraints are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationFilter {
    /// Equals-match on the owning project.
    pub project_id: Option<DbId>,
    /// Equals-match on the lemma both uses of the pair belong to.
    pub lemma_id: Option<DbId>,
    /// Equals-match on the annotator.
    pub annotator_id: Option<DbId>,
    /// In-set match on the judgment value.
    pub judgments: Option<Vec<f32>>,
}

impl AnnotationFilter {
    /// Everything in one project.
    pub fn for_project(project_id: DbId) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    /// One annotator's work on one lemma; the scope used for sequence
    /// progress recomputation.
    pub fn for_annotator_and_lemma(annotator_id: DbId, lemma_id: DbId) -> Self {
        Self {
            annotator_id: Some(annotator_id),
            lemma_id: Some(lemma_id),
            ..Self::default()
        }
    }

    /// True when no constraint is set.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_only_their_fields() {
        let f = AnnotationFilter::for_annotator_and_lemma(3, 9);
        assert_eq!(f.annotator_id, Some(3));
        assert_eq!(f.lemma_id, Some(9));
        assert_eq!(f.project_id, None);
        assert!(!f.is_unconstrained());
        assert!(AnnotationFilter::default().is_unconstrained());
    }
}
