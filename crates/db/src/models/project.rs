//! Project model and DTOs.

use lexanno_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub language: String,
    pub created_by: DbId,
    /// When true, sequences enumerate all possible pairs of a lemma's
    /// uses; when false, only curated instances.
    pub all_possible_pairs: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub language: String,
    pub created_by: DbId,
    pub all_possible_pairs: bool,
}
