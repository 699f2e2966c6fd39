//! Watermark generation and detection core for codemark
//!
//! This crate implements the entropy-gated bias-and-detect protocol: a family
//! of seeding schemes derives a per-position green list from generation
//! context, a biasing sampler nudges generation toward green tokens at
//! high-entropy positions, and a detector replays the same derivation over a
//! token sequence to accumulate the `(T, G, z)` statistic.
//!
//! The underlying generation engine is external; it is consumed only through
//! two hook points — a next-token logit vector per step and the realized
//! token id sequence (plus its per-position entropies at detection time).

pub mod detector;
pub mod entropy;
pub mod greenlist;
pub mod sampler;
pub mod seeding;

pub use detector::Detector;
pub use entropy::{shannon_entropy, softmax, EntropyGate};
pub use greenlist::GreenList;
pub use sampler::{bias_green_logits, StepOutcome, WatermarkSampler};
pub use seeding::{scheme_for, semantic_scheme, SeedingScheme, SemanticEncoder};
