//! Generation-time biasing sampler.
//!
//! At each eligible position, a fixed positive bias `delta` is added to the
//! logits of every green-list token before the engine applies its own
//! temperature / top-p sampling. Non-eligible positions pass through
//! untouched. The adjustment never resizes the vocabulary and never
//! renormalizes — the relative ordering of non-green tokens is preserved.

use codemark_core::{CodemarkError, Result, TokenId, WatermarkConfig};
use tracing::trace;

use crate::entropy::{shannon_entropy, softmax, EntropyGate};
use crate::greenlist::GreenList;
use crate::seeding::{scheme_for, SeedingScheme};

/// Add `delta` to the logits of every green token, in place.
pub fn bias_green_logits(logits: &mut [f32], green: &GreenList, delta: f64) {
    for (token, logit) in logits.iter_mut().enumerate() {
        if green.contains(token as TokenId) {
            *logit += delta as f32;
        }
    }
}

/// What happened at one generation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Whether the position was watermark-eligible (and therefore biased).
    pub eligible: bool,
    /// Shannon entropy of the unbiased next-token distribution.
    pub entropy: f64,
}

/// Per-step watermark pipeline for generation:
/// seed derivation → green-list selection → entropy gate → logit bias.
///
/// The sampler attaches to the external generation engine at its next-token
/// hook: the engine hands over the raw logit vector for the current step and
/// the context emitted so far, and samples from the (possibly adjusted)
/// logits afterward. The sampler holds no model state and issues no writes
/// to the engine.
pub struct WatermarkSampler {
    config: WatermarkConfig,
    scheme: Box<dyn SeedingScheme>,
    gate: EntropyGate,
    vocab_size: usize,
}

impl WatermarkSampler {
    /// Build a sampler from a validated configuration.
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

    /// Build a sampler around an externally constructed scheme (used for the
    /// semantic-embedding scheme, which needs an encoder).
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

    /// The configuration this sampler was built with.
    #[must_use]
    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Run one generation step: adjust `logits` in place if the position is
    /// eligible, and report what happened.
    ///
    /// Positions with a context shorter than the scheme's minimum prefix are
    /// never eligible and pass through untouched.
    pub fn step(&self, context: &[TokenId], logits: &mut [f32]) -> Result<StepOutcome> {
        if logits.len() != self.vocab_size {
            return Err(CodemarkError::Config(format!(
                "logit vector of length {} does not match vocabulary size {}",
                logits.len(),
                self.vocab_size
            )));
        }

        let entropy = shannon_entropy(&softmax(logits));
        if context.len() < self.scheme.min_prefix_len() || !self.gate.is_eligible(entropy) {
            return Ok(StepOutcome {
                eligible: false,
                entropy,
            });
        }

        let seed = self.scheme.derive_seed(context)?;
        let green = GreenList::select(seed, self.vocab_size, self.config.gamma);
        bias_green_logits(logits, &green, self.config.delta);
        trace!(entropy, seed, "biased eligible position");

        Ok(StepOutcome {
            eligible: true,
            entropy,
        })
    }
}
