//! Entropy gating for selective watermarking.
//!
//! Biasing near-deterministic positions either cannot change the sampled
//! token (no test signal) or forces a low-probability token (quality damage
//! — e.g. mandatory syntax tokens in code). Gating on Shannon entropy
//! excludes those positions from both biasing and counting, raising
//! detection power per unit of quality cost. The entropy computation must
//! match bit-for-bit between generation and detection replay.

/// Numerically stable softmax over raw logits.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy of a probability distribution, in nats.
///
/// Zero-probability terms contribute nothing. The caller is responsible for
/// passing a normalized distribution.
#[must_use]
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Per-position eligibility filter: watermark only where the next-token
/// distribution is uncertain enough.
#[derive(Debug, Clone, Copy)]
pub struct EntropyGate {
    threshold: f64,
}

impl EntropyGate {
    /// Create a gate with the given entropy threshold (nats).
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a position with the given entropy is watermark-eligible.
    ///
    /// Eligible iff the entropy strictly exceeds the threshold.
    #[must_use]
    pub fn is_eligible(&self, entropy: f64) -> bool {
        entropy > self.threshold
    }

    /// Eligibility from a raw next-token distribution.
    #[must_use]
    pub fn is_eligible_probs(&self, probs: &[f64]) -> bool {
        self.is_eligible(shannon_entropy(probs))
    }
}
