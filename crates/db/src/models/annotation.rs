//! User annotation model and DTOs.

use lexanno_core::pair::UsePair;
use lexanno_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `annotations` table. Identity is (annotator, unordered
/// pair); the row stores the canonical pair orientation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Annotation {
    pub id: DbId,
    pub annotator_id: DbId,
    pub use1_id: DbId,
    pub use2_id: DbId,
    /// 0..=4, or -1 for "no judgment supplied".
    pub judgment: f32,
    pub comment: String,
    pub judged_at: Timestamp,
}

impl Annotation {
    /// The unordered pair this annotation judges.
    pub fn pair(&self) -> UsePair {
        UsePair::new(self.use1_id, self.use2_id).expect("annotation row with identical use ids")
    }

    /// Cache key: annotator plus canonical pair.
    pub fn key(&self) -> AnnotationKey {
        AnnotationKey {
            annotator_id: self.annotator_id,
            pair: self.pair(),
        }
    }
}

/// Lookup key for the batch-scoped annotation cache. Because [`UsePair`]
/// is canonical, both orderings of a pair resolve to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationKey {
    pub annotator_id: DbId,
    pub pair: UsePair,
}

/// DTO for inserting or upserting an annotation.
#[derive(Debug, Clone)]
pub struct UpsertAnnotation {
    pub annotator_id: DbId,
    pub pair: UsePair,
    pub judgment: f32,
    pub comment: String,
}
