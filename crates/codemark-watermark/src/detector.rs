//! Watermark detection: gate replay and the `(T, G, z)` statistic.
//!
//! Detection replays seed derivation, green-list selection, and the entropy
//! gate over a token sequence *without* biasing, using each position's
//! actual preceding tokens. After an attack those tokens may differ from
//! what the generator saw — that is precisely what the statistic measures.
//! Per-position entropies come from the same external model replay that
//! produced the distributions at generation time.

use codemark_core::{
    CodemarkError, DetectionOutcome, DetectionStatistic, Result, TokenId, UndetectableReason,
    WatermarkConfig,
};
use tracing::debug;

use crate::entropy::EntropyGate;
use crate::greenlist::GreenList;
use crate::seeding::{scheme_for, SeedingScheme};

/// Compute `z = (G - gamma*T) / sqrt(gamma*(1-gamma)*T)`.
///
/// Only defined for `T > 0`. Monotonically non-decreasing in `G` for fixed
/// `T` — required for downstream ranking-based metrics to be meaningful.
#[must_use]
pub fn z_score(green: usize, eligible: usize, gamma: f64) -> f64 {
    let t = eligible as f64;
    (green as f64 - gamma * t) / (gamma * (1.0 - gamma) * t).sqrt()
}

/// Replays the watermark over token sequences and scores them.
pub struct Detector {
    config: WatermarkConfig,
    scheme: Box<dyn SeedingScheme>,
    gate: EntropyGate,
    vocab_size: usize,
}

impl Detector {
    /// Build a detector from a validated configuration.
    ///
    /// `delta` in the configuration is ignored — detection never biases.
    pub fn new(config: WatermarkConfig, vocab_size: usize) -> Result<Self> {
        config.validate()?;
        let scheme = scheme_for(config.scheme, config.secret_key)?;
        let gate = EntropyGate::new(config.entropy_threshold);
        Ok(Self {
            config,
            scheme,
            gate,
            vocab_size,
        })
    }

    /// Build a detector around an externally constructed scheme (semantic
    /// embedding).
    pub fn with_scheme(
        config: WatermarkConfig,
        scheme: Box<dyn SeedingScheme>,
        vocab_size: usize,
    ) -> Result<Self> {
        config.validate()?;
        let gate = EntropyGate::new(config.entropy_threshold);
        Ok(Self {
            config,
            scheme,
            gate,
            vocab_size,
        })
    }

    /// The scheme's minimum prefix length.
    #[must_use]
    pub fn min_prefix_len(&self) -> usize {
        self.scheme.min_prefix_len()
    }

    /// Score one token sequence.
    ///
    /// `entropies[i]` is the Shannon entropy of the replayed next-token
    /// distribution at position `i` and must be index-aligned with `tokens`.
    /// Returns [`DetectionOutcome::Undetectable`] when no position
    /// contributes to the statistic (`T = 0`) — callers must treat this as
    /// "cannot detect", never as "not watermarked".
    pub fn detect(&self, tokens: &[TokenId], entropies: &[f64]) -> Result<DetectionOutcome> {
        if tokens.len() != entropies.len() {
            return Err(CodemarkError::Config(format!(
                "entropy series of length {} does not match token sequence of length {}",
                entropies.len(),
                tokens.len()
            )));
        }

        let min_prefix = self.scheme.min_prefix_len();
        if tokens.len() <= min_prefix {
            return Ok(DetectionOutcome::Undetectable {
                reason: UndetectableReason::BelowMinPrefix,
            });
        }

        let mut eligible = 0usize;
        let mut green_hits = 0usize;
        for position in min_prefix..tokens.len() {
            if !self.gate.is_eligible(entropies[position]) {
                continue;
            }
            eligible += 1;

            let context = &tokens[..position];
            let seed = self.scheme.derive_seed(context)?;
            let green = GreenList::select(seed, self.vocab_size, self.config.gamma);
            if green.contains(tokens[position]) {
                green_hits += 1;
            }
        }

        if eligible == 0 {
            return Ok(DetectionOutcome::Undetectable {
                reason: UndetectableReason::NoEligiblePositions,
            });
        }

        let z = z_score(green_hits, eligible, self.config.gamma);
        debug!(
            eligible,
            green = green_hits,
            z,
            scheme = %self.config.scheme,
            "scored document"
        );
        Ok(DetectionOutcome::Scored(DetectionStatistic {
            eligible,
            green: green_hits,
            z,
        }))
    }
}
