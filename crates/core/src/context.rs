//! Explicit annotation context.
//!
//! Interactive operations receive this value instead of reading from an
//! ambient per-session singleton, so nothing in the core couples to a web
//! session lifecycle.

use crate::types::DbId;

/// Everything an interactive judgment save needs to know about where the
/// annotator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationContext {
    pub annotator_id: DbId,
    pub lemma_id: DbId,
    /// The persisted seed of this annotator's sequence for the lemma.
    pub seed: i64,
    /// Progress snapshot at the time the context was built.
    pub index: usize,
}
