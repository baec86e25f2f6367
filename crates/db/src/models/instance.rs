//! Curated use-pair (instance) model.

use lexanno_core::pair::UsePair;
use lexanno_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `instances` table. `use1_id < use2_id` by constraint,
/// so the stored orientation is the canonical one.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Instance {
    pub id: DbId,
    pub project_id: DbId,
    pub lemma_id: DbId,
    pub use1_id: DbId,
    pub use2_id: DbId,
    pub created_at: Timestamp,
}

impl Instance {
    /// The unordered pair this instance represents.
    pub fn pair(&self) -> UsePair {
        // The check constraint guarantees distinct ids.
        UsePair::new(self.use1_id, self.use2_id).expect("instance row with identical use ids")
    }
}

/// DTO for inserting a curated pair.
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub project_id: DbId,
    pub lemma_id: DbId,
    pub pair: UsePair,
}
