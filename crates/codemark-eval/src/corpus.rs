//! Corpus loading and parallel document scoring.
//!
//! Documents are scored independently; a worker pool pulls them off a
//! shared counter and the results are re-ordered by input position, so the
//! output is deterministic regardless of scheduling. A document that fails
//! to score (malformed entropy series, for example) is recorded as a
//! per-document error and never aborts its siblings.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use codemark_core::{CorpusLabel, DetectionOutcome, Result, ScorePopulation, TokenId};
use codemark_watermark::Detector;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One pre-tokenized document with its replayed entropy series.
///
/// `entropies[i]` is the Shannon entropy of the model's next-token
/// distribution at position `i`, produced by the same external engine
/// replay that detection assumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizedDocument {
    /// Stable document identifier (file stem, dataset id, …).
    pub id: String,
    /// The token sequence.
    pub tokens: Vec<TokenId>,
    /// Per-position replayed entropies, index-aligned with `tokens`.
    pub entropies: Vec<f64>,
}

/// Per-document scoring result. Exactly one of `outcome` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentScore {
    /// The document's identifier.
    pub id: String,
    /// Detection outcome, when scoring ran to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DetectionOutcome>,
    /// Error message, when scoring failed for this document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Load a corpus of tokenized documents from a JSON array file.
pub fn load_corpus(path: &Path) -> Result<Vec<TokenizedDocument>> {
    let raw = fs::read_to_string(path)?;
    let documents: Vec<TokenizedDocument> = serde_json::from_str(&raw)?;
    info!(path = %path.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Score every document in the corpus against `detector`.
///
/// Results come back in input order. `workers` is clamped to at least one
/// thread and at most one per document.
#[must_use]
pub fn detect_corpus(
    detector: &Detector,
    documents: &[TokenizedDocument],
    workers: usize,
) -> Vec<DocumentScore> {
    if documents.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, documents.len());

    let next = AtomicUsize::new(0);
    let mut indexed: Vec<(usize, DocumentScore)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= documents.len() {
                            break;
                        }
                        local.push((index, score_document(detector, &documents[index])));
                    }
                    local
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_default())
            .collect()
    });
    indexed.sort_unstable_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, score)| score).collect()
}

fn score_document(detector: &Detector, document: &TokenizedDocument) -> DocumentScore {
    match detector.detect(&document.tokens, &document.entropies) {
        Ok(outcome) => DocumentScore {
            id: document.id.clone(),
            outcome: Some(outcome),
            error: None,
        },
        Err(error) => {
            warn!(document = %document.id, %error, "document failed to score");
            DocumentScore {
                id: document.id.clone(),
                outcome: None,
                error: Some(error.to_string()),
            }
        }
    }
}

/// Collapse per-document scores into a labelled population. Documents that
/// errored are dropped here (they are preserved in the evaluation record);
/// undetectable documents are counted but contribute no score.
#[must_use]
pub fn population(label: CorpusLabel, scores: &[DocumentScore]) -> ScorePopulation {
    let outcomes: Vec<DetectionOutcome> = scores
        .iter()
        .filter_map(|score| score.outcome)
        .collect();
    ScorePopulation::from_outcomes(label, &outcomes)
}
