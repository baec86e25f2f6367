//! Annotation sequence model.

use lexanno_core::sequencer::{sequence_state, SequenceState};
use lexanno_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sequences` table: seed and progress for one
/// (annotator, lemma).
///
/// `idx` is a cache of the annotator's stored annotation count for the
/// lemma. It is always recomputed from that count — never incremented in
/// memory — so a partially failed judgment write leaves it correct on the
/// next recompute.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sequence {
    pub annotator_id: DbId,
    pub lemma_id: DbId,
    /// 63-bit seed; the only source of randomness for the pair order.
    pub seed: i64,
    pub idx: i32,
    pub created_at: Timestamp,
}

impl Sequence {
    /// Whether the sequence has run through all `total_pairs` pairs.
    pub fn is_complete(&self, total_pairs: usize) -> bool {
        self.idx as usize >= total_pairs
    }

    /// Progress classification against the total pair count.
    pub fn state(&self, total_pairs: usize) -> SequenceState {
        sequence_state(Some(self.idx as usize), total_pairs)
    }
}
