//! Lemma (lexical item) model.

use lexanno_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `lemmas` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Lemma {
    pub id: DbId,
    pub project_id: DbId,
    pub lemma: String,
    pub created_at: Timestamp,
}
