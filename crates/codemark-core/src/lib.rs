//! Core types, configuration, and errors for codemark
//!
//! This crate contains the foundational types shared across all codemark
//! components: the watermark configuration surface, seeding-scheme and
//! rename-strategy identifiers, detection outcomes, and labeled score
//! populations consumed by the evaluation metrics.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vocabulary & token types
// ---------------------------------------------------------------------------

/// A token identifier in the shared generation/detection vocabulary.
///
/// The vocabulary is the ordered set `0..V` for a fixed size `V`; both the
/// biasing sampler and the detector must agree on `V` exactly.
pub type TokenId = u32;

// ---------------------------------------------------------------------------
// Seeding scheme identifiers
// ---------------------------------------------------------------------------

/// Identifier for a watermark seeding scheme.
///
/// Each scheme derives a per-position seed from a different slice of the
/// generation context. Schemes are listed in increasing order of context
/// dependence; wider contexts give stronger per-position mixing but are more
/// fragile under text-editing attacks that touch tokens inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeId {
    /// Context-free: every position shares one green list (`k = 0`).
    Unigram,
    /// Seeded from the single preceding token (`k = 1`).
    LastToken,
    /// Rolling hash over the trailing 3 tokens.
    Rolling3,
    /// Rolling hash over the trailing 5 tokens.
    Rolling5,
    /// Seeded from a semantic embedding of the trailing context window.
    ///
    /// Experimental — requires a bit-deterministic encoder. See the scheme
    /// documentation in `codemark-watermark` for the reproducibility caveat.
    SemanticEmbedding,
}

impl SchemeId {
    /// All supported schemes, in increasing order of context dependence.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            Self::Unigram,
            Self::LastToken,
            Self::Rolling3,
            Self::Rolling5,
            Self::SemanticEmbedding,
        ]
    }

    /// Number of trailing context tokens the scheme reads.
    #[must_use]
    pub fn context_width(&self) -> usize {
        match self {
            Self::Unigram => 0,
            Self::LastToken => 1,
            Self::Rolling3 => 3,
            Self::Rolling5 => 5,
            Self::SemanticEmbedding => 10,
        }
    }
}

impl std::fmt::Display for SchemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unigram => write!(f, "unigram"),
            Self::LastToken => write!(f, "last_token"),
            Self::Rolling3 => write!(f, "rolling_3"),
            Self::Rolling5 => write!(f, "rolling_5"),
            Self::SemanticEmbedding => write!(f, "semantic_embedding"),
        }
    }
}

impl std::str::FromStr for SchemeId {
    type Err = CodemarkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unigram" | "fixed" => Ok(Self::Unigram),
            "last_token" | "last-token" => Ok(Self::LastToken),
            "rolling_3" | "rolling-3" => Ok(Self::Rolling3),
            "rolling_5" | "rolling-5" => Ok(Self::Rolling5),
            "semantic_embedding" | "semantic" => Ok(Self::SemanticEmbedding),
            _ => Err(CodemarkError::Config(format!("unknown scheme: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Watermark configuration
// ---------------------------------------------------------------------------

/// Process-wide watermark configuration.
///
/// Shared by generation and detection; constructed once at startup,
/// validated before any document is processed, and passed by reference into
/// every component. `delta` is only consulted at generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Seeding scheme to use.
    pub scheme: SchemeId,
    /// Green-list fraction of the vocabulary, in (0, 1).
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Logit bias added to green tokens at eligible positions (> 0).
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Shannon-entropy threshold for watermark eligibility (>= 0).
    #[serde(default = "default_entropy_threshold")]
    pub entropy_threshold: f64,
    /// Secret watermark key mixed into every derived seed.
    #[serde(default = "default_secret_key")]
    pub secret_key: u64,
}

fn default_gamma() -> f64 {
    0.25
}

fn default_delta() -> f64 {
    3.0
}

fn default_entropy_threshold() -> f64 {
    1.2
}

fn default_secret_key() -> u64 {
    15_485_863
}

impl WatermarkConfig {
    /// Create a configuration for `scheme` with default knobs.
    #[must_use]
    pub fn new(scheme: SchemeId) -> Self {
        Self {
            scheme,
            gamma: default_gamma(),
            delta: default_delta(),
            entropy_threshold: default_entropy_threshold(),
            secret_key: default_secret_key(),
        }
    }

    /// Set the green-list fraction.
    #[must_use]
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the green-token logit bias.
    #[must_use]
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Set the entropy-gate threshold.
    #[must_use]
    pub fn with_entropy_threshold(mut self, threshold: f64) -> Self {
        self.entropy_threshold = threshold;
        self
    }

    /// Set the secret key.
    #[must_use]
    pub fn with_secret_key(mut self, key: u64) -> Self {
        self.secret_key = key;
        self
    }

    /// Validate the configuration, failing fast before any document is
    /// processed.
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(CodemarkError::Config(format!(
                "gamma must be in (0, 1), got {}",
                self.gamma
            )));
        }
        if self.delta <= 0.0 {
            return Err(CodemarkError::Config(format!(
                "delta must be > 0, got {}",
                self.delta
            )));
        }
        if self.entropy_threshold < 0.0 {
            return Err(CodemarkError::Config(format!(
                "entropy_threshold must be >= 0, got {}",
                self.entropy_threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rename attack strategy
// ---------------------------------------------------------------------------

/// Strategy for generating replacement identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameStrategy {
    /// Fixed-length random lowercase strings (collision-checked).
    Random,
    /// `var_1`, `var_2`, … in deterministic selection order.
    Sequential,
    /// Underscore-delimited opaque tags: `_xxxxxx_1`, `_xxxxxx_2`, …
    Obfuscate,
}

impl std::fmt::Display for RenameStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Sequential => write!(f, "sequential"),
            Self::Obfuscate => write!(f, "obfuscate"),
        }
    }
}

impl std::str::FromStr for RenameStrategy {
    type Err = CodemarkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            "obfuscate" => Ok(Self::Obfuscate),
            _ => Err(CodemarkError::Config(format!("unknown strategy: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection outcomes
// ---------------------------------------------------------------------------

/// The statistical result of replaying the watermark over one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatistic {
    /// Number of gate-eligible positions (`T`).
    pub eligible: usize,
    /// Eligible positions whose realized token fell in its green list (`G`).
    pub green: usize,
    /// Normalized excess of green tokens over chance:
    /// `z = (G - gamma*T) / sqrt(gamma*(1-gamma)*T)`.
    pub z: f64,
}

impl DetectionStatistic {
    /// Fraction of eligible tokens that were green.
    #[must_use]
    pub fn green_fraction(&self) -> f64 {
        if self.eligible == 0 {
            0.0
        } else {
            self.green as f64 / self.eligible as f64
        }
    }
}

/// Why a document could not be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndetectableReason {
    /// The token sequence is shorter than the scheme's minimum prefix.
    BelowMinPrefix,
    /// Every replayed position fell below the entropy threshold.
    NoEligiblePositions,
}

impl std::fmt::Display for UndetectableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMinPrefix => write!(f, "sequence shorter than minimum prefix"),
            Self::NoEligiblePositions => write!(f, "no eligible positions above entropy threshold"),
        }
    }
}

/// Outcome of detection for a single document.
///
/// `Undetectable` means "cannot decide", not "not watermarked". Callers must
/// never coerce it to a z-score of zero — a zero z is indistinguishable from
/// a genuinely unwatermarked-looking document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// The statistic is defined (`T > 0`).
    Scored(DetectionStatistic),
    /// No eligible positions were available (`T = 0`).
    Undetectable {
        /// Why the statistic is undefined for this document.
        reason: UndetectableReason,
    },
}

impl DetectionOutcome {
    /// The z-score, if the document was scorable.
    #[must_use]
    pub fn z(&self) -> Option<f64> {
        match self {
            Self::Scored(stat) => Some(stat.z),
            Self::Undetectable { .. } => None,
        }
    }

    /// The underlying statistic, if scorable.
    #[must_use]
    pub fn statistic(&self) -> Option<&DetectionStatistic> {
        match self {
            Self::Scored(stat) => Some(stat),
            Self::Undetectable { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Score populations
// ---------------------------------------------------------------------------

/// Ground-truth label for a corpus of detection scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusLabel {
    /// Human-authored (unwatermarked) documents — the negative class.
    Human,
    /// Machine-generated (potentially watermarked) documents — the positive
    /// class for all ranking metrics.
    Machine,
}

impl std::fmt::Display for CorpusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Machine => write!(f, "machine"),
        }
    }
}

impl std::str::FromStr for CorpusLabel {
    type Err = CodemarkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "machine" => Ok(Self::Machine),
            _ => Err(CodemarkError::Config(format!("unknown corpus label: {s}"))),
        }
    }
}

/// A labeled collection of z-scores, immutable once built.
///
/// Undetectable documents contribute no score; the count of such documents
/// is carried separately so downstream reporting can surface them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePopulation {
    /// Which corpus these scores came from.
    pub label: CorpusLabel,
    /// z-scores of the scorable documents.
    scores: Vec<f64>,
    /// Number of documents that yielded no score.
    undetectable: usize,
}

impl ScorePopulation {
    /// Build a population from per-document outcomes.
    #[must_use]
    pub fn from_outcomes(label: CorpusLabel, outcomes: &[DetectionOutcome]) -> Self {
        let mut scores = Vec::with_capacity(outcomes.len());
        let mut undetectable = 0;
        for outcome in outcomes {
            match outcome.z() {
                Some(z) => scores.push(z),
                None => undetectable += 1,
            }
        }
        Self {
            label,
            scores,
            undetectable,
        }
    }

    /// Build a population directly from raw scores.
    #[must_use]
    pub fn from_scores(label: CorpusLabel, scores: Vec<f64>) -> Self {
        Self {
            label,
            scores,
            undetectable: 0,
        }
    }

    /// The z-scores of the scorable documents.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Number of scorable documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the population holds no scores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of documents that could not be scored.
    #[must_use]
    pub fn undetectable_count(&self) -> usize {
        self.undetectable
    }

    /// Mean z-score, or `None` for an empty population.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum CodemarkError {
    /// Configuration error — invalid scheme, gamma, delta, ratio, or
    /// threshold. Raised before any document is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seeding-scheme error (e.g. the semantic encoder failed).
    #[error("Scheme error: {0}")]
    Scheme(String),

    /// Rename-attack error.
    #[error("Attack error: {0}")]
    Attack(String),

    /// I/O error while reading or writing evaluation artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, CodemarkError>`.
pub type Result<T> = std::result::Result<T, CodemarkError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
