//! Repository for the `annotations` table.

use lexanno_core::filter::AnnotationFilter;
use lexanno_core::pair::UsePair;
use lexanno_core::types::DbId;
use sqlx::PgPool;

use crate::models::annotation::{Annotation, UpsertAnnotation};

/// Column list for annotations queries (aliased for joined selects).
const COLUMNS: &str =
    "a.id, a.annotator_id, a.use1_id, a.use2_id, a.judgment, a.comment, a.judged_at";

/// Provides CRUD operations for annotations.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Insert or overwrite the annotation for `(annotator, pair)`.
    ///
    /// The pair identity is unordered; the canonical orientation is what
    /// gets stored, so both orderings hit the same row. An existing
    /// annotation's judgment, comment, and timestamp are all replaced.
    pub async fn upsert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &UpsertAnnotation,
    ) -> Result<Annotation, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotations AS a
                (annotator_id, use1_id, use2_id, judgment, comment)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (annotator_id, use1_id, use2_id)
             DO UPDATE SET judgment = EXCLUDED.judgment,
                           comment = EXCLUDED.comment,
                           judged_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(input.annotator_id)
            .bind(input.pair.first())
            .bind(input.pair.second())
            .bind(input.judgment)
            .bind(&input.comment)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find the annotation for `(annotator, pair)`, if any.
    pub async fn find_by_identity(
        pool: &PgPool,
        annotator_id: DbId,
        pair: UsePair,
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations a
             WHERE a.annotator_id = $1 AND a.use1_id = $2 AND a.use2_id = $3"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(annotator_id)
            .bind(pair.first())
            .bind(pair.second())
            .fetch_optional(pool)
            .await
    }

    /// Prefetch all annotations a set of annotators has made within a
    /// project, for the merge engine's in-memory cache.
    pub async fn list_for_annotators_in_project(
        pool: &PgPool,
        project_id: DbId,
        annotator_ids: &[DbId],
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations a
             JOIN uses u ON u.id = a.use1_id
             JOIN lemmas l ON l.id = u.lemma_id
             WHERE l.project_id = $1 AND a.annotator_id = ANY($2)"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(project_id)
            .bind(annotator_ids)
            .fetch_all(pool)
            .await
    }

    /// List annotations matching a typed filter.
    ///
    /// Absent filter fields compile to always-true predicates, so the
    /// unconstrained filter returns every annotation.
    pub async fn list_with_filter(
        pool: &PgPool,
        filter: &AnnotationFilter,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations a
             JOIN uses u ON u.id = a.use1_id
             JOIN lemmas l ON l.id = u.lemma_id
             WHERE ($1::BIGINT IS NULL OR l.project_id = $1)
               AND ($2::BIGINT IS NULL OR u.lemma_id = $2)
               AND ($3::BIGINT IS NULL OR a.annotator_id = $3)
               AND ($4::REAL[] IS NULL OR a.judgment = ANY($4))
             ORDER BY a.judged_at ASC, a.id ASC"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(filter.project_id)
            .bind(filter.lemma_id)
            .bind(filter.annotator_id)
            .bind(filter.judgments.as_deref())
            .fetch_all(pool)
            .await
    }

    /// Delete one annotator's annotations on one lemma.
    ///
    /// Returns the number of deleted rows.
    pub async fn delete_for_annotator_and_lemma(
        pool: &PgPool,
        annotator_id: DbId,
        lemma_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM annotations a
             USING uses u
             WHERE u.id = a.use1_id AND a.annotator_id = $1 AND u.lemma_id = $2",
        )
        .bind(annotator_id)
        .bind(lemma_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
