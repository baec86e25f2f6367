//! Repository for the `lemmas` table.

use lexanno_core::types::DbId;
use sqlx::PgPool;

use crate::models::lemma::Lemma;

/// Column list for lemmas queries.
const COLUMNS: &str = "id, project_id, lemma, created_at";

/// Provides CRUD operations for lemmas.
pub struct LemmaRepo;

impl LemmaRepo {
    /// Insert a new lemma within an upload transaction, returning the
    /// created row.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        project_id: DbId,
        lemma: &str,
    ) -> Result<Lemma, sqlx::Error> {
        let query = format!(
            "INSERT INTO lemmas (project_id, lemma) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lemma>(&query)
            .bind(project_id)
            .bind(lemma)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a lemma by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Lemma>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lemmas WHERE id = $1");
        sqlx::query_as::<_, Lemma>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a lemma by project and headword.
    pub async fn find_by_project_and_lemma(
        pool: &PgPool,
        project_id: DbId,
        lemma: &str,
    ) -> Result<Option<Lemma>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lemmas WHERE project_id = $1 AND lemma = $2");
        sqlx::query_as::<_, Lemma>(&query)
            .bind(project_id)
            .bind(lemma)
            .fetch_optional(pool)
            .await
    }

    /// List all lemmas of a project, ordered by headword.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Lemma>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lemmas WHERE project_id = $1 ORDER BY lemma");
        sqlx::query_as::<_, Lemma>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
