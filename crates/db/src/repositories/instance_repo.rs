//! Repository for the `instances` table.

use lexanno_core::types::DbId;
use sqlx::PgPool;

use crate::models::instance::{CreateInstance, Instance};

/// Column list for instances queries.
const COLUMNS: &str = "id, project_id, lemma_id, use1_id, use2_id, created_at";

/// Provides CRUD operations for curated use pairs.
pub struct InstanceRepo;

impl InstanceRepo {
    /// Insert a curated pair within an upload transaction.
    ///
    /// The pair is stored in canonical orientation; re-uploading the same
    /// pair (in either orientation) is a no-op. Returns `true` if a row
    /// was inserted.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateInstance,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO instances (project_id, lemma_id, use1_id, use2_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project_id, use1_id, use2_id) DO NOTHING",
        )
        .bind(input.project_id)
        .bind(input.lemma_id)
        .bind(input.pair.first())
        .bind(input.pair.second())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the curated pairs of a lemma, in insertion order.
    pub async fn list_for_lemma(
        pool: &PgPool,
        lemma_id: DbId,
    ) -> Result<Vec<Instance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instances WHERE lemma_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Instance>(&query)
            .bind(lemma_id)
            .fetch_all(pool)
            .await
    }

    /// Count curated pairs for a given lemma.
    pub async fn count_for_lemma(pool: &PgPool, lemma_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM instances WHERE lemma_id = $1")
            .bind(lemma_id)
            .fetch_one(pool)
            .await
    }
}
