//! Evaluation harness for the code watermark.
//!
//! Ties the detector and the rename attack together into a measurable
//! pipeline: load pre-tokenized human and machine corpora, score every
//! document, collapse the scores into labelled populations, and report ROC
//! metrics (AUROC, TPR at fixed false-positive budgets). Each run persists
//! a self-describing JSON record so results can be audited later.
//!
//! Two binaries front this crate: `eval` runs one configuration end to
//! end, `rename` applies the identifier rename attack to a source file.

pub mod corpus;
pub mod metrics;
pub mod records;
pub mod report;

pub use corpus::{detect_corpus, load_corpus, population, DocumentScore, TokenizedDocument};
pub use metrics::{auroc, tpr_at_fpr, RocMetrics};
pub use records::{CorpusSummary, EvaluationRecord};
pub use report::{append_summary_row, write_metrics_file, SweepRow};
