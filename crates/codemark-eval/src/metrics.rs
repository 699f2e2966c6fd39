//! ROC metrics over human and machine score populations.
//!
//! The detector's z-score is a ranking statistic; everything here is
//! rank-based and therefore invariant under any strictly increasing
//! transform of the scores. Degenerate inputs (an empty population on
//! either side) yield the chance sentinels — AUROC 0.5, TPR 0.0 — rather
//! than an error, so a sweep over many configurations never aborts on one
//! pathological corpus.

use codemark_core::ScorePopulation;
use serde::{Deserialize, Serialize};

/// The four headline numbers for one (scheme, attack) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocMetrics {
    /// Area under the ROC curve (Mann–Whitney estimator, ties half-credit).
    pub auroc: f64,
    /// True-positive rate at zero tolerated false positives.
    pub tpr_at_0: f64,
    /// True-positive rate at 1% false-positive rate.
    pub tpr_at_1: f64,
    /// True-positive rate at 5% false-positive rate.
    pub tpr_at_5: f64,
}

impl RocMetrics {
    /// Compute all four metrics from the two populations.
    #[must_use]
    pub fn compute(human: &ScorePopulation, machine: &ScorePopulation) -> Self {
        Self {
            auroc: auroc(human.scores(), machine.scores()),
            tpr_at_0: tpr_at_fpr(human.scores(), machine.scores(), 0.0),
            tpr_at_1: tpr_at_fpr(human.scores(), machine.scores(), 0.01),
            tpr_at_5: tpr_at_fpr(human.scores(), machine.scores(), 0.05),
        }
    }
}

/// Rank-based AUROC: the probability that a random machine score outranks a
/// random human score, with ties counted half.
///
/// Scores are pooled and ranked with average ranks for ties; the
/// Mann–Whitney U statistic of the machine sample is then normalised by
/// `n_machine * n_human`. Either population empty yields the chance value.
#[must_use]
pub fn auroc(human: &[f64], machine: &[f64]) -> f64 {
    if human.is_empty() || machine.is_empty() {
        return 0.5;
    }

    // Pool scores, tagging machine entries, and sort ascending.
    let mut pooled: Vec<(f64, bool)> = human
        .iter()
        .map(|&s| (s, false))
        .chain(machine.iter().map(|&s| (s, true)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Assign average ranks across tie groups and sum machine ranks.
    let mut machine_rank_sum = 0.0f64;
    let mut i = 0;
    while i < pooled.len() {
        let mut j = i;
        while j < pooled.len() && pooled[j].0 == pooled[i].0 {
            j += 1;
        }
        // Ranks are 1-based; ties share the group's average rank.
        let average_rank = ((i + 1 + j) as f64) / 2.0;
        for entry in &pooled[i..j] {
            if entry.1 {
                machine_rank_sum += average_rank;
            }
        }
        i = j;
    }

    let n_machine = machine.len() as f64;
    let n_human = human.len() as f64;
    let u = machine_rank_sum - n_machine * (n_machine + 1.0) / 2.0;
    u / (n_machine * n_human)
}

/// True-positive rate at a fixed false-positive budget.
///
/// The budget tolerates `floor(fpr * n_human)` false positives: the
/// threshold is set just above the human score at that (0-based, descending)
/// rank, and the TPR is the fraction of machine scores strictly above it.
/// `fpr = 0` therefore demands a threshold above every human score.
#[must_use]
pub fn tpr_at_fpr(human: &[f64], machine: &[f64], fpr: f64) -> f64 {
    if human.is_empty() || machine.is_empty() {
        return 0.0;
    }

    let allowed = (fpr * human.len() as f64).floor() as usize;
    if allowed >= human.len() {
        return 1.0;
    }

    let mut descending = human.to_vec();
    descending.sort_by(|a, b| b.total_cmp(a));
    let threshold = descending[allowed];

    let hits = machine.iter().filter(|&&score| score > threshold).count();
    hits as f64 / machine.len() as f64
}
