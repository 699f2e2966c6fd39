//! Seed derivation schemes.
//!
//! Every scheme is one capability: `derive_seed(context) -> u64` plus a
//! declared `min_prefix_len`. Adding a scheme means implementing
//! [`SeedingScheme`] and extending the [`scheme_for`] factory — no other
//! component changes.
//!
//! Detection must reconstruct the *same* context window the generator used,
//! token-for-token. Any transformation between generation and detection that
//! changes a token id inside the window (identifier renaming, re-tokenization
//! drift) changes the derived seed and therefore the green-list partition at
//! that position.

use codemark_core::{CodemarkError, Result, SchemeId, TokenId};
use sha2::{Digest, Sha256};

/// Fixed prime multiplier for the rolling k-gram hash.
const ROLLING_PRIME: u64 = 1_000_003;

/// Quantization step applied to semantic embeddings before hashing.
///
/// Rounding each component to this granularity absorbs small cross-device
/// floating-point differences that would otherwise change the hashed bit
/// pattern and decorrelate generation from detection.
const EMBEDDING_QUANTUM: f32 = 1e-4;

/// splitmix64 finalizer — cheap integer mixing with full avalanche.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

// ---------------------------------------------------------------------------
// Scheme capability
// ---------------------------------------------------------------------------

/// A watermark seeding scheme: context window → integer seed.
///
/// Implementations must be deterministic pure functions of the trailing
/// `context_width()` tokens and the secret key. Tokens outside the window
/// must have zero effect on the seed.
pub trait SeedingScheme: Send + Sync {
    /// Derive the seed for the position that follows `context`.
    ///
    /// `context` is the full preceding token sequence; the scheme reads only
    /// its trailing window. Fails if the context is shorter than
    /// [`min_prefix_len`](Self::min_prefix_len).
    fn derive_seed(&self, context: &[TokenId]) -> Result<u64>;

    /// Minimum context length before the first position becomes eligible.
    fn min_prefix_len(&self) -> usize;

    /// Number of trailing context tokens the scheme reads.
    fn context_width(&self) -> usize;

    /// Which scheme this is.
    fn id(&self) -> SchemeId;
}

fn require_prefix(context: &[TokenId], min: usize) -> Result<()> {
    if context.len() < min {
        return Err(CodemarkError::Scheme(format!(
            "context of length {} is shorter than minimum prefix {}",
            context.len(),
            min
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fixed / unigram scheme (k = 0)
// ---------------------------------------------------------------------------

/// Context-free scheme: the seed is the secret key for every position.
#[derive(Debug, Clone)]
pub struct UnigramScheme {
    key: u64,
}

impl UnigramScheme {
    /// Create the scheme for `key`.
    #[must_use]
    pub fn new(key: u64) -> Self {
        Self { key }
    }
}

impl SeedingScheme for UnigramScheme {
    fn derive_seed(&self, _context: &[TokenId]) -> Result<u64> {
        Ok(splitmix64(self.key))
    }

    fn min_prefix_len(&self) -> usize {
        0
    }

    fn context_width(&self) -> usize {
        0
    }

    fn id(&self) -> SchemeId {
        SchemeId::Unigram
    }
}

// ---------------------------------------------------------------------------
// Single-token scheme (k = 1)
// ---------------------------------------------------------------------------

/// Seeded from the single preceding token: `seed = mix(key ^ last_token)`.
#[derive(Debug, Clone)]
pub struct LastTokenScheme {
    key: u64,
}

impl LastTokenScheme {
    /// Create the scheme for `key`.
    #[must_use]
    pub fn new(key: u64) -> Self {
        Self { key }
    }
}

impl SeedingScheme for LastTokenScheme {
    fn derive_seed(&self, context: &[TokenId]) -> Result<u64> {
        require_prefix(context, 1)?;
        let last = u64::from(context[context.len() - 1]);
        Ok(splitmix64(self.key ^ last))
    }

    fn min_prefix_len(&self) -> usize {
        1
    }

    fn context_width(&self) -> usize {
        1
    }

    fn id(&self) -> SchemeId {
        SchemeId::LastToken
    }
}

// ---------------------------------------------------------------------------
// Rolling k-gram scheme (k = 3 or 5)
// ---------------------------------------------------------------------------

/// Polynomial rolling hash over the trailing `k` token ids, combined with
/// the secret key through a splitmix64 finalizer.
///
/// Changing any one token inside the window changes the seed with
/// overwhelming probability (avalanche); tokens at position `-(k+1)` or
/// earlier have no effect.
#[derive(Debug, Clone)]
pub struct RollingKGramScheme {
    key: u64,
    k: usize,
}

impl RollingKGramScheme {
    /// Create a rolling scheme over the trailing `k` tokens.
    #[must_use]
    pub fn new(key: u64, k: usize) -> Self {
        Self { key, k }
    }
}

impl SeedingScheme for RollingKGramScheme {
    fn derive_seed(&self, context: &[TokenId]) -> Result<u64> {
        require_prefix(context, self.k)?;
        let window = &context[context.len() - self.k..];
        let mut hash: u64 = 0;
        for &token in window {
            hash = hash
                .wrapping_mul(ROLLING_PRIME)
                .wrapping_add(u64::from(token).wrapping_add(1));
        }
        Ok(splitmix64(hash ^ self.key))
    }

    fn min_prefix_len(&self) -> usize {
        self.k
    }

    fn context_width(&self) -> usize {
        self.k
    }

    fn id(&self) -> SchemeId {
        match self.k {
            3 => SchemeId::Rolling3,
            _ => SchemeId::Rolling5,
        }
    }
}

// ---------------------------------------------------------------------------
// Semantic-embedding scheme (experimental)
// ---------------------------------------------------------------------------

/// External semantic encoder hook: context tokens → fixed-size vector.
///
/// Typically mean pooling over sub-token embeddings of an external model.
/// The encoder runs at both generation and detection time and must be the
/// same model with the same tokenization on both sides.
pub trait SemanticEncoder: Send + Sync {
    /// Encode the trailing context window into a real-valued vector.
    fn encode(&self, context: &[TokenId]) -> Result<Vec<f32>>;
}

/// Seeded from a SHA-256 hash of the quantized context embedding.
///
/// # Reproducibility caveat
///
/// This scheme is only sound if the encoder produces the same vector — after
/// quantization — at generation time and at detection time. Different
/// execution devices, floating accumulation orders, or a tokenization
/// mismatch between the generation vocabulary and the encoder's own
/// vocabulary all change the hash input, decorrelating the green lists on
/// the two sides and driving the detection statistic toward (or below) the
/// null expectation. Components are rounded to a 1e-4 grid before hashing to
/// absorb small numeric drift; larger divergence is surfaced by detection,
/// not masked. Treat this scheme as experimental.
pub struct SemanticEmbeddingScheme {
    key: u64,
    width: usize,
    encoder: Box<dyn SemanticEncoder>,
}

impl SemanticEmbeddingScheme {
    /// Create the scheme over the trailing `width` tokens using `encoder`.
    #[must_use]
    pub fn new(key: u64, width: usize, encoder: Box<dyn SemanticEncoder>) -> Self {
        Self {
            key,
            width,
            encoder,
        }
    }
}

impl SeedingScheme for SemanticEmbeddingScheme {
    fn derive_seed(&self, context: &[TokenId]) -> Result<u64> {
        require_prefix(context, self.width)?;
        let window = &context[context.len() - self.width..];
        let embedding = self.encoder.encode(window)?;
        if embedding.is_empty() {
            return Err(CodemarkError::Scheme(
                "semantic encoder returned an empty embedding".to_string(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(self.key.to_le_bytes());
        for component in &embedding {
            // Quantize to a fixed grid so the hashed bit pattern survives
            // sub-quantum floating-point drift between the two sides.
            let quantized = (component / EMBEDDING_QUANTUM).round() as i64;
            hasher.update(quantized.to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Ok(u64::from_le_bytes(bytes))
    }

    fn min_prefix_len(&self) -> usize {
        self.width
    }

    fn context_width(&self) -> usize {
        self.width
    }

    fn id(&self) -> SchemeId {
        SchemeId::SemanticEmbedding
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the scheme for `id` with the given secret key.
///
/// The semantic-embedding scheme needs an external encoder and cannot be
/// built here — use [`semantic_scheme`] instead.
pub fn scheme_for(id: SchemeId, key: u64) -> Result<Box<dyn SeedingScheme>> {
    match id {
        SchemeId::Unigram => Ok(Box::new(UnigramScheme::new(key))),
        SchemeId::LastToken => Ok(Box::new(LastTokenScheme::new(key))),
        SchemeId::Rolling3 => Ok(Box::new(RollingKGramScheme::new(key, 3))),
        SchemeId::Rolling5 => Ok(Box::new(RollingKGramScheme::new(key, 5))),
        SchemeId::SemanticEmbedding => Err(CodemarkError::Config(
            "semantic_embedding requires an encoder; use semantic_scheme()".to_string(),
        )),
    }
}

/// Build the semantic-embedding scheme with an external encoder.
pub fn semantic_scheme(
    key: u64,
    width: usize,
    encoder: Box<dyn SemanticEncoder>,
) -> Box<dyn SeedingScheme> {
    Box::new(SemanticEmbeddingScheme::new(key, width, encoder))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
