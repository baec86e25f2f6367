//! Merging uploaded annotations into stored state.
//!
//! The engine works in two phases. The *plan* phase is pure: it resolves
//! every record against prefetched lookup maps and decides, per row,
//! whether to write, skip, or report an error. The *apply* phase executes
//! the plan inside a caller-managed transaction and recomputes every
//! touched sequence from the stored annotation counts. Nothing is written
//! when any row of the batch fails to resolve.

use std::collections::{BTreeSet, HashMap, HashSet};

use lexanno_core::pair::UsePair;
use lexanno_core::parse::RowError;
use lexanno_core::records::{AnnotationRecord, JUDGMENT_NONE, MAX_COMMENT_LEN};
use lexanno_core::types::DbId;
use lexanno_db::models::annotation::{Annotation, AnnotationKey, UpsertAnnotation};
use lexanno_db::models::sequence::Sequence;
use lexanno_db::repositories::{
    AnnotationRepo, LemmaRepo, SequenceRepo, UseRepo, UserRepo,
};
use lexanno_db::DbPool;
use tracing::info;

use crate::error::{FileError, IngestError};

/// Prefetched lookup state for one merge batch.
///
/// Loaded once per batch so the plan phase never touches the database.
/// The annotation cache is keyed by (annotator, canonical pair), which
/// makes both orderings of a pair hit the same entry.
pub struct MergeContext {
    pub project_id: DbId,
    /// Headword to lemma id, project scope.
    pub lemma_ids: HashMap<String, DbId>,
    /// (headword, external identifier) to use id, project scope.
    pub use_ids: HashMap<(String, String), DbId>,
    /// Username to user id, batch scope.
    pub annotators: HashMap<String, DbId>,
    /// Existing annotations of the batch's annotators, project scope.
    pub existing: HashMap<AnnotationKey, Annotation>,
}

impl MergeContext {
    /// Prefetch everything a batch of records can reference.
    pub async fn load(
        pool: &DbPool,
        project_id: DbId,
        records: &[AnnotationRecord],
    ) -> Result<Self, sqlx::Error> {
        let lemma_ids: HashMap<String, DbId> = LemmaRepo::list_for_project(pool, project_id)
            .await?
            .into_iter()
            .map(|lemma| (lemma.lemma, lemma.id))
            .collect();
        let use_ids = UseRepo::ids_by_identifier(pool, project_id).await?;

        let usernames: Vec<String> = records
            .iter()
            .map(|record| record.annotator.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let annotators = UserRepo::ids_by_usernames(pool, &usernames).await?;

        let annotator_ids: Vec<DbId> = annotators.values().copied().collect();
        let existing = AnnotationRepo::list_for_annotators_in_project(
            pool,
            project_id,
            &annotator_ids,
        )
        .await?
        .into_iter()
        .map(|annotation| (annotation.key(), annotation))
        .collect();

        Ok(Self {
            project_id,
            lemma_ids,
            use_ids,
            annotators,
            existing,
        })
    }

    /// Fill cache misses with live lookups. Keys that resolve to a stored
    /// annotation are written back; genuinely absent keys stay absent.
    pub async fn backfill(
        &mut self,
        pool: &DbPool,
        keys: &[AnnotationKey],
    ) -> Result<(), sqlx::Error> {
        for key in keys {
            if self.existing.contains_key(key) {
                continue;
            }
            if let Some(annotation) =
                AnnotationRepo::find_by_identity(pool, key.annotator_id, key.pair).await?
            {
                self.existing.insert(*key, annotation);
            }
        }
        Ok(())
    }
}

/// The decided writes of one batch.
#[derive(Debug, Default)]
pub struct MergePlan {
    pub writes: Vec<UpsertAnnotation>,
    /// Rows whose sentinel judgment left an existing annotation untouched.
    pub skipped: usize,
    /// Every (annotator, lemma) whose sequence must be recomputed.
    pub touched: BTreeSet<(DbId, DbId)>,
    pub errors: Vec<RowError>,
}

/// Result of applying a merge plan.
#[derive(Debug)]
pub struct MergeOutcome {
    pub written: usize,
    pub skipped: usize,
    pub sequences: Vec<Sequence>,
}

/// A record with all references resolved to database ids.
struct ResolvedRow {
    annotator_id: DbId,
    lemma_id: DbId,
    pair: UsePair,
    judgment: f32,
    comment: String,
}

impl ResolvedRow {
    fn key(&self) -> AnnotationKey {
        AnnotationKey {
            annotator_id: self.annotator_id,
            pair: self.pair,
        }
    }
}

pub struct AnnotationMergeEngine;

impl AnnotationMergeEngine {
    /// Decide what one batch of records does to stored state.
    ///
    /// Upsert rules per resolved row:
    /// - no stored annotation: insert, sentinel included (the row counts
    ///   toward sequence progress either way);
    /// - stored annotation and a real judgment: overwrite judgment,
    ///   comment, and timestamp;
    /// - stored annotation and the sentinel: touch nothing.
    pub fn plan(records: &[AnnotationRecord], ctx: &MergeContext) -> MergePlan {
        let mut plan = MergePlan::default();
        // Writes already planned in this batch, by identity.
        let mut planned: HashMap<AnnotationKey, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let line = index + 2;
            let row = match resolve(record, ctx, line) {
                Ok(row) => row,
                Err(error) => {
                    plan.errors.push(error);
                    continue;
                }
            };

            plan.touched.insert((row.annotator_id, row.lemma_id));
            let key = row.key();
            let already_stored =
                ctx.existing.contains_key(&key) || planned.contains_key(&key);

            if row.judgment == JUDGMENT_NONE && already_stored {
                plan.skipped += 1;
                continue;
            }

            let write = UpsertAnnotation {
                annotator_id: row.annotator_id,
                pair: row.pair,
                judgment: row.judgment,
                comment: row.comment,
            };
            match planned.get(&key) {
                Some(&slot) => plan.writes[slot] = write,
                None => {
                    planned.insert(key, plan.writes.len());
                    plan.writes.push(write);
                }
            }
        }

        plan
    }

    /// The annotation identities a batch will consult, for cache
    /// backfilling. Unresolvable rows are skipped; `plan` reports them.
    pub fn consulted_keys(records: &[AnnotationRecord], ctx: &MergeContext) -> Vec<AnnotationKey> {
        let mut keys: Vec<AnnotationKey> = Vec::new();
        let mut seen: HashSet<AnnotationKey> = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            if let Ok(row) = resolve(record, ctx, index + 2) {
                let key = row.key();
                if seen.insert(key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Execute a plan inside the caller's transaction: upsert every write,
    /// then recompute and persist every touched sequence.
    pub async fn apply(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        plan: &MergePlan,
    ) -> Result<MergeOutcome, sqlx::Error> {
        for write in &plan.writes {
            AnnotationRepo::upsert(tx, write).await?;
        }

        let mut sequences = Vec::with_capacity(plan.touched.len());
        for &(annotator_id, lemma_id) in &plan.touched {
            SequenceRepo::get_or_create(tx, annotator_id, lemma_id).await?;
            let sequence = SequenceRepo::recompute_idx(tx, annotator_id, lemma_id).await?;
            sequences.push(sequence);
        }

        Ok(MergeOutcome {
            written: plan.writes.len(),
            skipped: plan.skipped,
            sequences,
        })
    }

    /// Merge one file's records as a standalone unit of work.
    pub async fn merge_batch(
        pool: &DbPool,
        project_id: DbId,
        file: &str,
        records: &[AnnotationRecord],
    ) -> Result<MergeOutcome, IngestError> {
        let mut ctx = MergeContext::load(pool, project_id, records).await?;
        let keys = Self::consulted_keys(records, &ctx);
        ctx.backfill(pool, &keys).await?;

        let plan = Self::plan(records, &ctx);
        if !plan.errors.is_empty() {
            return Err(IngestError::single(FileError::new(file, plan.errors)));
        }

        let mut tx = pool.begin().await?;
        let outcome = Self::apply(&mut tx, &plan).await?;
        tx.commit().await?;
        info!(
            file,
            written = outcome.written,
            skipped = outcome.skipped,
            sequences = outcome.sequences.len(),
            "merged annotation batch"
        );
        Ok(outcome)
    }
}

fn resolve(
    record: &AnnotationRecord,
    ctx: &MergeContext,
    line: usize,
) -> Result<ResolvedRow, RowError> {
    let annotator_id = *ctx
        .annotators
        .get(&record.annotator)
        .ok_or_else(|| RowError::new(line, format!("unknown annotator '{}'", record.annotator)))?;
    let lemma_id = *ctx
        .lemma_ids
        .get(&record.lemma)
        .ok_or_else(|| RowError::new(line, format!("unknown lemma '{}'", record.lemma)))?;

    let use1 = resolve_use(ctx, &record.lemma, &record.identifier1, line)?;
    let use2 = resolve_use(ctx, &record.lemma, &record.identifier2, line)?;
    let pair = UsePair::new(use1, use2)
        .map_err(|_| RowError::new(line, "a pair must reference two distinct uses"))?;

    if record.comment.chars().count() > MAX_COMMENT_LEN {
        return Err(RowError::new(
            line,
            format!("comment exceeds {MAX_COMMENT_LEN} characters"),
        ));
    }

    Ok(ResolvedRow {
        annotator_id,
        lemma_id,
        pair,
        judgment: record.judgment,
        comment: record.comment.clone(),
    })
}

fn resolve_use(
    ctx: &MergeContext,
    lemma: &str,
    identifier: &str,
    line: usize,
) -> Result<DbId, RowError> {
    ctx.use_ids
        .get(&(lemma.to_string(), identifier.to_string()))
        .copied()
        .ok_or_else(|| {
            RowError::new(
                line,
                format!("identifier '{identifier}' does not occur in lemma '{lemma}'"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx() -> MergeContext {
        MergeContext {
            project_id: 1,
            lemma_ids: [("Bank".to_string(), 10)].into(),
            use_ids: [
                (("Bank".to_string(), "u1".to_string()), 101),
                (("Bank".to_string(), "u2".to_string()), 102),
                (("Bank".to_string(), "u3".to_string()), 103),
            ]
            .into(),
            annotators: [("anna".to_string(), 7)].into(),
            existing: HashMap::new(),
        }
    }

    fn with_existing(mut ctx: MergeContext, pair: UsePair, judgment: f32) -> MergeContext {
        let annotation = Annotation {
            id: 900,
            annotator_id: 7,
            use1_id: pair.first(),
            use2_id: pair.second(),
            judgment,
            comment: String::new(),
            judged_at: Utc::now(),
        };
        ctx.existing.insert(annotation.key(), annotation);
        ctx
    }

    fn record(id1: &str, id2: &str, judgment: f32) -> AnnotationRecord {
        AnnotationRecord {
            lemma: "Bank".to_string(),
            identifier1: id1.to_string(),
            identifier2: id2.to_string(),
            annotator: "anna".to_string(),
            judgment,
            comment: String::new(),
        }
    }

    #[test]
    fn fresh_rows_become_writes_and_touch_their_sequence() {
        let plan = AnnotationMergeEngine::plan(
            &[record("u1", "u2", 3.0), record("u1", "u3", JUDGMENT_NONE)],
            &ctx(),
        );
        assert!(plan.errors.is_empty());
        // The sentinel row is still inserted when nothing is stored yet.
        assert_eq!(plan.writes.len(), 2);
        assert_eq!(plan.skipped, 0);
        assert_eq!(plan.touched.iter().collect::<Vec<_>>(), vec![&(7, 10)]);
    }

    #[test]
    fn sentinel_leaves_an_existing_judgment_untouched() {
        let pair = UsePair::new(101, 102).unwrap();
        let ctx = with_existing(ctx(), pair, 2.0);
        let plan = AnnotationMergeEngine::plan(&[record("u2", "u1", JUDGMENT_NONE)], &ctx);
        assert!(plan.writes.is_empty());
        assert_eq!(plan.skipped, 1);
        // Skipped rows still count toward progress recomputation.
        assert!(plan.touched.contains(&(7, 10)));
    }

    #[test]
    fn real_judgment_overwrites_an_existing_annotation() {
        let pair = UsePair::new(101, 102).unwrap();
        let ctx = with_existing(ctx(), pair, 2.0);
        let plan = AnnotationMergeEngine::plan(&[record("u2", "u1", 4.0)], &ctx);
        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.writes[0].judgment, 4.0);
        assert_eq!(plan.writes[0].pair, pair);
    }

    #[test]
    fn sentinel_respects_a_write_planned_earlier_in_the_batch() {
        let plan = AnnotationMergeEngine::plan(
            &[record("u1", "u2", 3.0), record("u2", "u1", JUDGMENT_NONE)],
            &ctx(),
        );
        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.writes[0].judgment, 3.0);
        assert_eq!(plan.skipped, 1);
    }

    #[test]
    fn unresolved_references_are_line_referenced_errors() {
        let mut bad_annotator = record("u1", "u2", 1.0);
        bad_annotator.annotator = "nobody".to_string();
        let mut bad_lemma = record("u1", "u2", 1.0);
        bad_lemma.lemma = "Blatt".to_string();
        let records = [bad_annotator, record("u1", "u9", 1.0), bad_lemma];

        let plan = AnnotationMergeEngine::plan(&records, &ctx());
        assert!(plan.writes.is_empty());
        assert_eq!(plan.errors.len(), 3);
        assert_eq!(plan.errors[0].line, 2);
        assert!(plan.errors[0].message.contains("nobody"));
        assert_eq!(plan.errors[1].line, 3);
        assert!(plan.errors[1].message.contains("u9"));
        assert_eq!(plan.errors[2].line, 4);
        assert!(plan.errors[2].message.contains("Blatt"));
    }

    #[test]
    fn overlong_comments_are_rejected() {
        let mut r = record("u1", "u2", 1.0);
        r.comment = "x".repeat(MAX_COMMENT_LEN + 1);
        let plan = AnnotationMergeEngine::plan(&[r], &ctx());
        assert_eq!(plan.errors.len(), 1);
        assert!(plan.errors[0].message.contains("255"));
    }

    #[test]
    fn consulted_keys_are_deduplicated_and_canonical() {
        let keys = AnnotationMergeEngine::consulted_keys(
            &[record("u1", "u2", 1.0), record("u2", "u1", 2.0)],
            &ctx(),
        );
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].pair, UsePair::new(101, 102).unwrap());
    }
}
