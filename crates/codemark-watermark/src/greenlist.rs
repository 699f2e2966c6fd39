//! Deterministic green-list selection.
//!
//! For a given seed, the vocabulary is partitioned into a green (favored)
//! and red (disfavored) set by a partial Fisher–Yates shuffle under a
//! ChaCha-seeded generator. Generation and detection run the exact same
//! routine — the whole protocol depends on bit-identical selection given
//! identical seeds.

use codemark_core::TokenId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The green/red partition of the vocabulary at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenList {
    members: Vec<bool>,
    green_count: usize,
}

impl GreenList {
    /// Select `round(gamma * vocab_size)` green tokens for `seed`.
    ///
    /// Repeated calls with the same arguments return identical partitions;
    /// different seeds give pairwise near-independent selections with no
    /// systematic bias toward low or high token ids.
    #[must_use]
    pub fn select(seed: u64, vocab_size: usize, gamma: f64) -> Self {
        let green_count = ((gamma * vocab_size as f64).round() as usize).min(vocab_size);
        let mut ids: Vec<TokenId> = (0..vocab_size as TokenId).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Partial Fisher–Yates: only the green prefix needs shuffling.
        let mut members = vec![false; vocab_size];
        for i in 0..green_count {
            let j = rng.gen_range(i..vocab_size);
            ids.swap(i, j);
            members[ids[i] as usize] = true;
        }

        Self {
            members,
            green_count,
        }
    }

    /// Whether `token` is in the green list.
    #[must_use]
    pub fn contains(&self, token: TokenId) -> bool {
        self.members
            .get(token as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Number of green tokens.
    #[must_use]
    pub fn green_count(&self) -> usize {
        self.green_count
    }

    /// Vocabulary size this partition covers.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.members.len()
    }

    /// Iterate over the green token ids in ascending order.
    pub fn iter_green(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, &green)| green)
            .map(|(id, _)| id as TokenId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_deterministic() {
        let a = GreenList::select(42, 1000, 0.25);
        let b = GreenList::select(42, 1000, 0.25);
        assert_eq!(a, b);
    }

    #[test]
    fn test_selection_size() {
        let list = GreenList::select(7, 1000, 0.25);
        assert_eq!(list.green_count(), 250);
        assert_eq!(list.iter_green().count(), 250);

        // round(), not floor(): 0.5 * 101 = 50.5 → 51
        let list = GreenList::select(7, 101, 0.5);
        assert_eq!(list.green_count(), 51);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = GreenList::select(1, 1000, 0.25);
        let b = GreenList::select(2, 1000, 0.25);
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_positional_bias() {
        // Across many seeds, low and high halves of the vocabulary should be
        // selected at close to equal rates.
        let vocab = 200;
        let mut low_hits = 0usize;
        let mut high_hits = 0usize;
        for seed in 0..200u64 {
            let list = GreenList::select(seed, vocab, 0.25);
            for token in list.iter_green() {
                if (token as usize) < vocab / 2 {
                    low_hits += 1;
                } else {
                    high_hits += 1;
                }
            }
        }
        let total = (low_hits + high_hits) as f64;
        let low_fraction = low_hits as f64 / total;
        assert!(
            (low_fraction - 0.5).abs() < 0.03,
            "low-id fraction {low_fraction} deviates from 0.5"
        );
    }

    #[test]
    fn test_contains_out_of_range() {
        let list = GreenList::select(42, 100, 0.25);
        assert!(!list.contains(100));
        assert!(!list.contains(5000));
    }

    #[test]
    fn test_gamma_one_rounds_to_full_vocab() {
        let list = GreenList::select(42, 50, 0.999);
        assert_eq!(list.green_count(), 50);
    }
}
