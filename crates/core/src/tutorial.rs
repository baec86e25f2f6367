//! Session-scoped tutorial sequencing and scoring.
//!
//! The tutorial reuses the pair-sequencing primitive but keeps progress
//! and judgments only for the lifetime of the session — nothing is
//! persisted. On completion the annotator's judgments are compared to the
//! gold standard over the same pairs, ordered consistently by pair
//! identity, with Spearman's rank correlation; the tutorial is passed iff
//! the coefficient exceeds [`PASS_THRESHOLD`].

use crate::pair::UsePair;

/// Minimum Spearman coefficient (exclusive) required to pass.
pub const PASS_THRESHOLD: f64 = 0.6;

/// Outcome of a completed tutorial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TutorialOutcome {
    pub rho: f64,
    pub passed: bool,
}

/// In-memory tutorial state for one annotator session.
#[derive(Debug, Clone)]
pub struct TutorialSession {
    pairs: Vec<UsePair>,
    gold: Vec<f64>,
    judgments: Vec<Option<f64>>,
    index: usize,
}

impl TutorialSession {
    /// Build a session from the gold standard. Items are ordered by pair
    /// identity so annotator and gold judgments always line up the same
    /// way, independent of storage order.
    pub fn new(mut gold_items: Vec<(UsePair, f64)>) -> Self {
        gold_items.sort_by_key(|(pair, _)| *pair);
        let (pairs, gold): (Vec<UsePair>, Vec<f64>) = gold_items.into_iter().unzip();
        let judgments = vec![None; pairs.len()];
        Self {
            pairs,
            gold,
            judgments,
            index: 0,
        }
    }

    /// The pair currently awaiting a judgment, or `None` once complete.
    pub fn current_pair(&self) -> Option<&UsePair> {
        self.pairs.get(self.index)
    }

    /// Current progress index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of tutorial pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Record the judgment for the current pair and advance.
    pub fn record_judgment(&mut self, judgment: f64) {
        if self.index < self.pairs.len() {
            self.judgments[self.index] = Some(judgment);
            self.index += 1;
        }
    }

    /// Whether every pair has been judged.
    pub fn is_complete(&self) -> bool {
        self.index >= self.pairs.len()
    }

    /// Score the completed session. Returns `None` while judgments are
    /// still missing or when the correlation is undefined (fewer than two
    /// pairs, or zero variance on either side).
    pub fn outcome(&self) -> Option<TutorialOutcome> {
        if !self.is_complete() {
            return None;
        }
        let judged: Vec<f64> = self.judgments.iter().copied().flatten().collect();
        if judged.len() != self.gold.len() {
            return None;
        }
        let rho = spearman(&self.gold, &judged)?;
        Some(TutorialOutcome {
            rho,
            passed: rho > PASS_THRESHOLD,
        })
    }
}

/// Spearman's rank correlation coefficient with average ranks for ties.
///
/// Returns `None` for fewer than two observations or when either side has
/// zero rank variance.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let rx = average_ranks(xs);
    let ry = average_ranks(ys);

    let n = rx.len() as f64;
    let mean_x = rx.iter().sum::<f64>() / n;
    let mean_y = ry.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in rx.iter().zip(&ry) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Assign 1-based ranks, averaging over ties.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the same value; each gets the mean rank.
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: i64, b: i64) -> UsePair {
        UsePair::new(a, b).unwrap()
    }

    #[test]
    fn perfect_agreement_scores_one() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [0.0, 1.0, 2.0, 3.0, 4.0];
        let rho = spearman(&xs, &ys).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_disagreement_scores_minus_one() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [3.0, 2.0, 1.0, 0.0];
        let rho = spearman(&xs, &ys).unwrap();
        assert!((rho + 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_get_average_ranks() {
        assert_eq!(average_ranks(&[1.0, 2.0, 2.0, 3.0]), vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn zero_variance_is_undefined() {
        assert!(spearman(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_none());
    }

    #[test]
    fn session_orders_pairs_by_identity() {
        let session = TutorialSession::new(vec![
            (pair(9, 3), 4.0),
            (pair(1, 2), 0.0),
            (pair(2, 5), 2.0),
        ]);
        assert_eq!(session.current_pair(), Some(&pair(1, 2)));
    }

    #[test]
    fn session_passes_on_matching_judgments() {
        let mut session = TutorialSession::new(vec![
            (pair(1, 2), 0.0),
            (pair(1, 3), 1.0),
            (pair(2, 3), 3.0),
            (pair(2, 4), 4.0),
        ]);
        for judgment in [0.0, 1.0, 3.0, 4.0] {
            session.record_judgment(judgment);
        }
        let outcome = session.outcome().unwrap();
        assert!(outcome.passed);
        assert!((outcome.rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn session_fails_on_anticorrelated_judgments() {
        let mut session = TutorialSession::new(vec![
            (pair(1, 2), 0.0),
            (pair(1, 3), 1.0),
            (pair(2, 3), 3.0),
            (pair(2, 4), 4.0),
        ]);
        for judgment in [4.0, 3.0, 1.0, 0.0] {
            session.record_judgment(judgment);
        }
        let outcome = session.outcome().unwrap();
        assert!(!outcome.passed);
        assert!(outcome.rho < 0.0);
    }

    #[test]
    fn incomplete_session_has_no_outcome() {
        let mut session = TutorialSession::new(vec![(pair(1, 2), 0.0), (pair(1, 3), 1.0)]);
        assert!(session.outcome().is_none());
        session.record_judgment(2.0);
        assert!(session.outcome().is_none());
    }
}
