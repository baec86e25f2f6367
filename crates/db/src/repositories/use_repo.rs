//! Repository for the `uses` table.

use std::collections::HashMap;

use lexanno_core::types::DbId;
use sqlx::PgPool;

use crate::models::uses::{CreateUse, Use};

/// Column list for uses queries.
const COLUMNS: &str = "id, lemma_id, identifier, context, pos, use_date, \
    grouping, description, token_start, token_end, sentence_start, \
    sentence_end, created_at";

/// Provides CRUD operations for word uses.
pub struct UseRepo;

impl UseRepo {
    /// Insert a batch of uses within an upload transaction, returning the
    /// new ids in input order.
    pub async fn insert_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inputs: &[CreateUse],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id: DbId = sqlx::query_scalar(
                "INSERT INTO uses
                    (lemma_id, identifier, context, pos, use_date, grouping,
                     description, token_start, token_end, sentence_start, sentence_end)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 RETURNING id",
            )
            .bind(input.lemma_id)
            .bind(&input.identifier)
            .bind(&input.context)
            .bind(&input.pos)
            .bind(&input.use_date)
            .bind(&input.grouping)
            .bind(&input.description)
            .bind(input.token_start)
            .bind(input.token_end)
            .bind(input.sentence_start)
            .bind(input.sentence_end)
            .fetch_one(&mut **tx)
            .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Find a use by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Use>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM uses WHERE id = $1");
        sqlx::query_as::<_, Use>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the uses of a lemma, ordered by external identifier.
    pub async fn list_for_lemma(pool: &PgPool, lemma_id: DbId) -> Result<Vec<Use>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM uses WHERE lemma_id = $1 ORDER BY identifier");
        sqlx::query_as::<_, Use>(&query)
            .bind(lemma_id)
            .fetch_all(pool)
            .await
    }

    /// List the ids of a lemma's uses in ascending order.
    ///
    /// The ordering is part of sequence determinism: pair enumeration
    /// starts from this sorted list.
    pub async fn list_ids_for_lemma(
        pool: &PgPool,
        lemma_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM uses WHERE lemma_id = $1 ORDER BY id ASC")
            .bind(lemma_id)
            .fetch_all(pool)
            .await
    }

    /// Map external identifiers to row ids for all uses of a project.
    ///
    /// Keyed by `(lemma headword, identifier)` since identifiers are only
    /// unique per lemma.
    pub async fn ids_by_identifier(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<HashMap<(String, String), DbId>, sqlx::Error> {
        let rows: Vec<(DbId, String, String)> = sqlx::query_as(
            "SELECT u.id, l.lemma, u.identifier
             FROM uses u
             JOIN lemmas l ON l.id = u.lemma_id
             WHERE l.project_id = $1",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, lemma, identifier)| ((lemma, identifier), id))
            .collect())
    }

    /// Count uses for a given lemma.
    pub async fn count_for_lemma(pool: &PgPool, lemma_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM uses WHERE lemma_id = $1")
            .bind(lemma_id)
            .fetch_one(pool)
            .await
    }
}
