//! Deterministic pair sequencing.
//!
//! Given a persisted seed and a candidate source, produces the ordering in
//! which an annotator sees use pairs. The seed is the only source of
//! randomness: building the same source with the same seed reproduces the
//! identical order across process restarts, which is what makes annotation
//! progress resumable (the stored index points into this ordering).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::pair::UsePair;
use crate::types::DbId;

/// Upper bound (exclusive) for freshly generated sequence seeds.
/// Seeds are 63-bit so they fit a signed BIGINT column.
pub const MAX_SEED: i64 = i64::MAX;

/// Where the candidate pairs of a sequence come from.
#[derive(Debug, Clone, Copy)]
pub enum PairSource<'a> {
    /// Every unordered combination of the given use ids (`n * (n-1) / 2`
    /// pairs). Ids are sorted and deduplicated before enumeration so the
    /// canonical pre-shuffle order is lexicographic regardless of input
    /// order.
    AllPairs(&'a [DbId]),
    /// A curated list of instances; canonical pre-shuffle order is the
    /// source order.
    Curated(&'a [UsePair]),
}

/// The progress state of an annotation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    NotStarted,
    InProgress,
    Complete,
}

/// A fully built, seed-shuffled ordering of use pairs.
#[derive(Debug, Clone)]
pub struct PairSequence {
    pairs: Vec<UsePair>,
}

impl PairSequence {
    /// Enumerate the canonical pair order for `source`, then permute it
    /// with a Fisher-Yates shuffle driven by a PRNG seeded from `seed`.
    pub fn build(seed: i64, source: PairSource<'_>) -> Self {
        let mut pairs = match source {
            PairSource::AllPairs(ids) => {
                let mut ids = ids.to_vec();
                ids.sort_unstable();
                ids.dedup();
                let mut pairs = Vec::with_capacity(expected_pair_count(ids.len()));
                for i in 0..ids.len() {
                    for j in (i + 1)..ids.len() {
                        // ids are distinct and sorted, so this cannot fail.
                        if let Ok(pair) = UsePair::new(ids[i], ids[j]) {
                            pairs.push(pair);
                        }
                    }
                }
                pairs
            }
            PairSource::Curated(instances) => instances.to_vec(),
        };

        let mut rng = StdRng::seed_from_u64(seed as u64);
        pairs.shuffle(&mut rng);

        Self { pairs }
    }

    /// The pair at `index`, or `None` once the sequence is exhausted.
    /// Pure lookup; does not mutate state.
    pub fn next(&self, index: usize) -> Option<&UsePair> {
        self.pairs.get(index)
    }

    /// Total number of pairs in the sequence.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// An empty sequence is treated as immediately complete.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether the stored progress index has reached the end.
    pub fn is_complete(&self, index: usize) -> bool {
        index >= self.pairs.len()
    }

    /// All pairs in sequence order.
    pub fn pairs(&self) -> &[UsePair] {
        &self.pairs
    }
}

/// Number of unordered pairs over `n` uses: `n * (n-1) / 2`.
pub fn expected_pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Generate a fresh 63-bit seed for a new sequence.
///
/// Called exactly once per (annotator, lemma); the value is persisted and
/// never regenerated afterwards.
pub fn generate_seed() -> i64 {
    rand::rng().random_range(0..MAX_SEED)
}

/// Classify stored progress against the total pair count.
pub fn sequence_state(index: Option<usize>, total_pairs: usize) -> SequenceState {
    match index {
        None => SequenceState::NotStarted,
        Some(idx) if idx >= total_pairs => SequenceState::Complete,
        Some(_) => SequenceState::InProgress,
    }
}
