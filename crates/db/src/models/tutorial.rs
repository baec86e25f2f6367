//! Tutorial gold-standard models.

use lexanno_core::pair::UsePair;
use lexanno_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `tutorials` table; one per language.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tutorial {
    pub id: DbId,
    pub language: String,
    pub created_at: Timestamp,
}

/// A row from the `tutorial_uses` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TutorialUse {
    pub id: DbId,
    pub tutorial_id: DbId,
    pub position: i32,
    pub context: String,
    pub token_start: i32,
    pub token_end: i32,
    pub sentence_start: i32,
    pub sentence_end: i32,
}

/// A row from the `gold_annotations` table: the reference judgment for
/// one tutorial pair.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoldAnnotation {
    pub id: DbId,
    pub tutorial_id: DbId,
    pub use1_id: DbId,
    pub use2_id: DbId,
    pub judgment: f32,
}

/// DTO for inserting one tutorial use.
#[derive(Debug, Clone)]
pub struct CreateTutorialUse {
    pub tutorial_id: DbId,
    pub position: i32,
    pub context: String,
    pub token_start: i32,
    pub token_end: i32,
    pub sentence_start: i32,
    pub sentence_end: i32,
}

/// DTO for inserting one gold judgment.
#[derive(Debug, Clone)]
pub struct CreateGoldAnnotation {
    pub tutorial_id: DbId,
    pub pair: UsePair,
    pub judgment: f32,
}
