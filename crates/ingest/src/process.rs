//! Interactive annotation flow.
//!
//! An annotator's position in a lemma is fully described by an
//! [`AnnotationContext`] value: seed and index pin down the pair order
//! and the current pair without any server-side session state. Saving a
//! judgment applies the same upsert rules as the bulk merge, then derives
//! the next position from the stored annotation count.

use lexanno_core::context::AnnotationContext;
use lexanno_core::error::CoreError;
use lexanno_core::pair::UsePair;
use lexanno_core::records::{is_valid_judgment, JUDGMENT_NONE, MAX_COMMENT_LEN};
use lexanno_core::sequencer::{sequence_state, PairSequence, PairSource, SequenceState};
use lexanno_core::types::DbId;
use lexanno_db::models::annotation::UpsertAnnotation;
use lexanno_db::repositories::{
    AnnotationRepo, InstanceRepo, LemmaRepo, ProjectRepo, SequenceRepo, UseRepo,
};
use lexanno_db::DbPool;
use tracing::info;

use crate::error::IngestError;

/// One step of an annotation session: where the annotator stands and
/// which pair (if any) to show next.
#[derive(Debug, Clone)]
pub struct AnnotationStep {
    pub context: AnnotationContext,
    /// The pair at the current index, `None` once the sequence is done.
    pub pair: Option<UsePair>,
    pub total_pairs: usize,
}

impl AnnotationStep {
    pub fn state(&self) -> SequenceState {
        sequence_state(Some(self.context.index), self.total_pairs)
    }
}

/// The pair candidates of a lemma, owned so the borrowed
/// [`PairSource`] can be rebuilt as often as needed.
enum Candidates {
    AllPairs(Vec<DbId>),
    Curated(Vec<UsePair>),
}

impl Candidates {
    fn as_source(&self) -> PairSource<'_> {
        match self {
            Self::AllPairs(ids) => PairSource::AllPairs(ids),
            Self::Curated(pairs) => PairSource::Curated(pairs),
        }
    }

    /// Candidates come from the project's pairing mode: the full
    /// combinatorial closure over the lemma's uses, or its curated
    /// instances.
    async fn load(pool: &DbPool, lemma_id: DbId) -> Result<Self, IngestError> {
        let lemma = LemmaRepo::find_by_id(pool, lemma_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "lemma",
                id: lemma_id,
            })?;
        let project = ProjectRepo::find_by_id(pool, lemma.project_id)
            .await?
            .ok_or_else(|| IngestError::system("lemma without a project"))?;

        if project.all_possible_pairs {
            let ids = UseRepo::list_ids_for_lemma(pool, lemma_id).await?;
            Ok(Self::AllPairs(ids))
        } else {
            let pairs = InstanceRepo::list_for_lemma(pool, lemma_id)
                .await?
                .iter()
                .map(|instance| instance.pair())
                .collect();
            Ok(Self::Curated(pairs))
        }
    }
}

/// Begin (or resume) annotating a lemma.
///
/// Creates the sequence with a fresh seed on first contact; afterwards
/// the stored seed reproduces the identical pair order, and the stored
/// index (derived from the annotation count) points at where to resume.
pub async fn start_annotation(
    pool: &DbPool,
    annotator_id: DbId,
    lemma_id: DbId,
) -> Result<AnnotationStep, IngestError> {
    let candidates = Candidates::load(pool, lemma_id).await?;

    let mut tx = pool.begin().await?;
    let sequence = SequenceRepo::get_or_create(&mut tx, annotator_id, lemma_id).await?;
    tx.commit().await?;

    let ordering = PairSequence::build(sequence.seed, candidates.as_source());
    let context = AnnotationContext {
        annotator_id,
        lemma_id,
        seed: sequence.seed,
        index: sequence.idx as usize,
    };
    info!(
        annotator_id,
        lemma_id,
        index = context.index,
        total = ordering.len(),
        "annotation session resumed"
    );
    Ok(AnnotationStep {
        pair: ordering.next(context.index).copied(),
        total_pairs: ordering.len(),
        context,
    })
}

/// Save the judgment for the context's current pair and advance.
///
/// Same rules as the bulk merge: a real judgment inserts or overwrites,
/// the sentinel inserts only when nothing is stored yet. The returned
/// step carries the recomputed index.
pub async fn save_judgment(
    pool: &DbPool,
    context: &AnnotationContext,
    judgment: f32,
    comment: &str,
) -> Result<AnnotationStep, IngestError> {
    if !is_valid_judgment(judgment) {
        return Err(IngestError::Invalid(format!(
            "judgment {judgment} is outside the 0..=4 scale (or -1 for none)"
        )));
    }
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(IngestError::Invalid(format!(
            "comment exceeds {MAX_COMMENT_LEN} characters"
        )));
    }

    let candidates = Candidates::load(pool, context.lemma_id).await?;
    let ordering = PairSequence::build(context.seed, candidates.as_source());
    let pair = *ordering.next(context.index).ok_or_else(|| {
        IngestError::Invalid("the sequence is already complete".to_string())
    })?;

    let existing = AnnotationRepo::find_by_identity(pool, context.annotator_id, pair).await?;

    let mut tx = pool.begin().await?;
    if !(judgment == JUDGMENT_NONE && existing.is_some()) {
        AnnotationRepo::upsert(
            &mut tx,
            &UpsertAnnotation {
                annotator_id: context.annotator_id,
                pair,
                judgment,
                comment: comment.to_string(),
            },
        )
        .await?;
    }
    let sequence =
        SequenceRepo::recompute_idx(&mut tx, context.annotator_id, context.lemma_id).await?;
    tx.commit().await?;

    let context = AnnotationContext {
        index: sequence.idx as usize,
        ..*context
    };
    Ok(AnnotationStep {
        pair: ordering.next(context.index).copied(),
        total_pairs: ordering.len(),
        context,
    })
}
