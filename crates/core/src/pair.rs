//! Unordered pairs of use identifiers.
//!
//! Pair identity is defined on the *set* of the two identifiers:
//! `{a, b}` and `{b, a}` are the same pair. The canonical representation
//! stores the smaller identifier first, so derived equality and hashing
//! are order-insensitive by construction.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// An unordered pair of two distinct use identifiers.
///
/// Always held in canonical form (`first < second`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsePair {
    first: DbId,
    second: DbId,
}

impl UsePair {
    /// Build a pair from two use identifiers, canonicalizing the order.
    ///
    /// The two identifiers must differ.
    pub fn new(a: DbId, b: DbId) -> Result<Self, CoreError> {
        if a == b {
            return Err(CoreError::Validation(format!(
                "A use pair must consist of two distinct uses, got {a} twice"
            )));
        }
        Ok(Self {
            first: a.min(b),
            second: a.max(b),
        })
    }

    /// The smaller of the two identifiers.
    pub fn first(&self) -> DbId {
        self.first
    }

    /// The larger of the two identifiers.
    pub fn second(&self) -> DbId {
        self.second
    }

    /// Both identifiers in canonical order.
    pub fn ids(&self) -> (DbId, DbId) {
        (self.first, self.second)
    }

    /// Whether the given use identifier is part of this pair.
    pub fn contains(&self, id: DbId) -> bool {
        self.first == id || self.second == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    #[test]
    fn pair_is_order_insensitive() {
        let ab = UsePair::new(101, 102).unwrap();
        let ba = UsePair::new(102, 101).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.ids(), (101, 102));
    }

    #[test]
    fn pair_hashes_on_the_set_of_ids() {
        let mut seen = HashSet::new();
        seen.insert(UsePair::new(7, 3).unwrap());
        assert!(seen.contains(&UsePair::new(3, 7).unwrap()));
    }

    #[test]
    fn identical_ids_are_rejected() {
        assert_matches!(UsePair::new(5, 5), Err(CoreError::Validation(_)));
    }

    #[test]
    fn contains_checks_both_sides() {
        let pair = UsePair::new(1, 2).unwrap();
        assert!(pair.contains(1));
        assert!(pair.contains(2));
        assert!(!pair.contains(3));
    }
}
