//! Word-use model and DTOs.

use lexanno_core::records::UseRecord;
use lexanno_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `uses` table: one attested occurrence of a lemma.
/// Immutable once created, except through deletion cascades.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Use {
    pub id: DbId,
    pub lemma_id: DbId,
    /// External identifier from the upload file, unique per lemma.
    pub identifier: String,
    pub context: String,
    pub pos: String,
    pub use_date: String,
    pub grouping: String,
    pub description: String,
    pub token_start: i32,
    pub token_end: i32,
    pub sentence_start: i32,
    pub sentence_end: i32,
    pub created_at: Timestamp,
}

/// DTO for inserting a new use.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUse {
    pub lemma_id: DbId,
    pub identifier: String,
    pub context: String,
    pub pos: String,
    pub use_date: String,
    pub grouping: String,
    pub description: String,
    pub token_start: i32,
    pub token_end: i32,
    pub sentence_start: i32,
    pub sentence_end: i32,
}

impl CreateUse {
    /// Build an insert DTO from a validated upload record.
    pub fn from_record(lemma_id: DbId, record: &UseRecord) -> Self {
        Self {
            lemma_id,
            identifier: record.identifier.clone(),
            context: record.context.clone(),
            pos: record.pos.clone(),
            use_date: record.date.clone(),
            grouping: record.grouping.clone(),
            description: record.description.clone(),
            token_start: record.token_span.start as i32,
            token_end: record.token_span.end as i32,
            sentence_start: record.sentence_span.start as i32,
            sentence_end: record.sentence_span.end as i32,
        }
    }
}
