//! Repository for tutorial tables.

use lexanno_core::types::DbId;
use sqlx::PgPool;

use crate::models::tutorial::{
    CreateGoldAnnotation, CreateTutorialUse, GoldAnnotation, Tutorial, TutorialUse,
};

/// Column list for tutorials queries.
const COLUMNS: &str = "id, language, created_at";

/// Provides CRUD operations for the per-language tutorials.
pub struct TutorialRepo;

impl TutorialRepo {
    /// Insert the tutorial row for a language within an upload
    /// transaction.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        language: &str,
    ) -> Result<Tutorial, sqlx::Error> {
        let query =
            format!("INSERT INTO tutorials (language) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Tutorial>(&query)
            .bind(language)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert a tutorial's uses, returning the new ids in input order.
    pub async fn insert_uses(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inputs: &[CreateTutorialUse],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id: DbId = sqlx::query_scalar(
                "INSERT INTO tutorial_uses
                    (tutorial_id, position, context, token_start, token_end,
                     sentence_start, sentence_end)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id",
            )
            .bind(input.tutorial_id)
            .bind(input.position)
            .bind(&input.context)
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

    /// Insert a tutorial's gold judgments.
    pub async fn insert_gold_annotations(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inputs: &[CreateGoldAnnotation],
    ) -> Result<(), sqlx::Error> {
        for input in inputs {
            sqlx::query(
                "INSERT INTO gold_annotations (tutorial_id, use1_id, use2_id, judgment)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(input.tutorial_id)
            .bind(input.pair.first())
            .bind(input.pair.second())
            .bind(input.judgment)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Find the tutorial for a language, if one is configured.
    pub async fn find_by_language(
        pool: &PgPool,
        language: &str,
    ) -> Result<Option<Tutorial>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutorials WHERE language = $1");
        sqlx::query_as::<_, Tutorial>(&query)
            .bind(language)
            .fetch_optional(pool)
            .await
    }

    /// List a tutorial's uses in presentation order.
    pub async fn list_uses(
        pool: &PgPool,
        tutorial_id: DbId,
    ) -> Result<Vec<TutorialUse>, sqlx::Error> {
        sqlx::query_as::<_, TutorialUse>(
            "SELECT id, tutorial_id, position, context, token_start, token_end,
                    sentence_start, sentence_end
             FROM tutorial_uses
             WHERE tutorial_id = $1
             ORDER BY position ASC",
        )
        .bind(tutorial_id)
        .fetch_all(pool)
        .await
    }

    /// List a tutorial's gold judgments.
    pub async fn list_gold_annotations(
        pool: &PgPool,
        tutorial_id: DbId,
    ) -> Result<Vec<GoldAnnotation>, sqlx::Error> {
        sqlx::query_as::<_, GoldAnnotation>(
            "SELECT id, tutorial_id, use1_id, use2_id, judgment
             FROM gold_annotations
             WHERE tutorial_id = $1
             ORDER BY id ASC",
        )
        .bind(tutorial_id)
        .fetch_all(pool)
        .await
    }
}
