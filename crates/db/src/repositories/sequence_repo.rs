//! Repository for the `sequences` table.

use lexanno_core::sequencer::generate_seed;
use lexanno_core::types::DbId;
use sqlx::PgPool;
use tracing::debug;

use crate::models::sequence::Sequence;

/// Column list for sequences queries.
const COLUMNS: &str = "annotator_id, lemma_id, seed, idx, created_at";

/// Provides CRUD operations for annotation sequences.
pub struct SequenceRepo;

impl SequenceRepo {
    /// Find the sequence for `(annotator, lemma)`, if one exists.
    pub async fn get(
        pool: &PgPool,
        annotator_id: DbId,
        lemma_id: DbId,
    ) -> Result<Option<Sequence>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sequences WHERE annotator_id = $1 AND lemma_id = $2"
        );
        sqlx::query_as::<_, Sequence>(&query)
            .bind(annotator_id)
            .bind(lemma_id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the sequence for `(annotator, lemma)`, creating it with a
    /// fresh seed and idx 0 if it does not exist yet.
    ///
    /// The insert races benignly: on conflict the existing row wins, so a
    /// seed that has been handed out once is never replaced.
    pub async fn get_or_create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        annotator_id: DbId,
        lemma_id: DbId,
    ) -> Result<Sequence, sqlx::Error> {
        let seed = generate_seed();
        sqlx::query(
            "INSERT INTO sequences (annotator_id, lemma_id, seed, idx)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (annotator_id, lemma_id) DO NOTHING",
        )
        .bind(annotator_id)
        .bind(lemma_id)
        .bind(seed)
        .execute(&mut **tx)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM sequences WHERE annotator_id = $1 AND lemma_id = $2"
        );
        sqlx::query_as::<_, Sequence>(&query)
            .bind(annotator_id)
            .bind(lemma_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Recompute the sequence position from the annotator's stored
    /// annotation count on the lemma, returning the updated row.
    ///
    /// The idx is never incremented in memory; this derivation is the only
    /// way it moves, so replayed or merged annotations can never push it
    /// out of step with the data.
    pub async fn recompute_idx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        annotator_id: DbId,
        lemma_id: DbId,
    ) -> Result<Sequence, sqlx::Error> {
        let query = format!(
            "UPDATE sequences s
             SET idx = (SELECT COUNT(*)::INTEGER FROM annotations a
                        JOIN uses u ON u.id = a.use1_id
                        WHERE a.annotator_id = s.annotator_id AND u.lemma_id = s.lemma_id)
             WHERE s.annotator_id = $1 AND s.lemma_id = $2
             RETURNING {COLUMNS}"
        );
        let sequence = sqlx::query_as::<_, Sequence>(&query)
            .bind(annotator_id)
            .bind(lemma_id)
            .fetch_one(&mut **tx)
            .await?;
        debug!(annotator_id, lemma_id, idx = sequence.idx, "sequence idx recomputed");
        Ok(sequence)
    }

    /// Persist a full sequence row, inserting or overwriting.
    pub async fn save(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        sequence: &Sequence,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sequences (annotator_id, lemma_id, seed, idx)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (annotator_id, lemma_id)
             DO UPDATE SET seed = EXCLUDED.seed, idx = EXCLUDED.idx",
        )
        .bind(sequence.annotator_id)
        .bind(sequence.lemma_id)
        .bind(sequence.seed)
        .bind(sequence.idx)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Persist a batch of sequence rows within one transaction.
    pub async fn save_all(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        sequences: &[Sequence],
    ) -> Result<(), sqlx::Error> {
        for sequence in sequences {
            Self::save(tx, sequence).await?;
        }
        Ok(())
    }

    /// List every sequence touching a project's lemmas.
    pub async fn all_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Sequence>, sqlx::Error> {
        let query = format!(
            "SELECT s.annotator_id, s.lemma_id, s.seed, s.idx, s.created_at
             FROM sequences s
             JOIN lemmas l ON l.id = s.lemma_id
             WHERE l.project_id = $1
             ORDER BY s.annotator_id ASC, s.lemma_id ASC"
        );
        sqlx::query_as::<_, Sequence>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
