//! Persisted evaluation records.
//!
//! One record captures everything needed to audit a single evaluation run:
//! the exact configuration, per-document outcomes for both corpora, the
//! aggregate population summaries, and the headline metrics. Records are
//! plain JSON files named by their id.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use codemark_core::{Result, ScorePopulation, WatermarkConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::DocumentScore;
use crate::metrics::RocMetrics;

/// Aggregate view of one scored corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSummary {
    /// Number of documents that produced a z-score.
    pub scored: usize,
    /// Number of documents that were undetectable.
    pub undetectable: usize,
    /// Mean z-score over the scored documents, absent if none scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_z: Option<f64>,
}

impl CorpusSummary {
    /// Summarise a population.
    #[must_use]
    pub fn from_population(population: &ScorePopulation) -> Self {
        Self {
            scored: population.len(),
            undetectable: population.undetectable_count(),
            mean_z: population.mean(),
        }
    }
}

/// A complete, self-describing evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Unique record id; also the file stem on disk.
    pub id: Uuid,
    /// When the evaluation ran.
    pub created_at: DateTime<Utc>,
    /// The watermark configuration under evaluation.
    pub config: WatermarkConfig,
    /// Vocabulary size used by the detector.
    pub vocab_size: usize,
    /// Rename ratio of the attacked machine corpus (0 = unattacked).
    pub attack_ratio: f64,
    /// Human-corpus aggregate.
    pub human: CorpusSummary,
    /// Machine-corpus aggregate.
    pub machine: CorpusSummary,
    /// Headline ROC metrics.
    pub metrics: RocMetrics,
    /// Per-document outcomes for the human corpus.
    pub human_documents: Vec<DocumentScore>,
    /// Per-document outcomes for the machine corpus.
    pub machine_documents: Vec<DocumentScore>,
}

impl EvaluationRecord {
    /// Assemble a record with a fresh id and the current timestamp.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WatermarkConfig,
        vocab_size: usize,
        attack_ratio: f64,
        human: &ScorePopulation,
        machine: &ScorePopulation,
        metrics: RocMetrics,
        human_documents: Vec<DocumentScore>,
        machine_documents: Vec<DocumentScore>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            config,
            vocab_size,
            attack_ratio,
            human: CorpusSummary::from_population(human),
            machine: CorpusSummary::from_population(machine),
            metrics,
            human_documents,
            machine_documents,
        }
    }

    /// Write the record as pretty JSON into `output_dir`, returning the
    /// written path.
    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(format!("eval_{}.json", self.id));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Read a record back from disk.
    pub fn read_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemark_core::{CorpusLabel, SchemeId};

    fn record() -> EvaluationRecord {
        let human = ScorePopulation::from_scores(CorpusLabel::Human, vec![-0.1, 0.2]);
        let machine = ScorePopulation::from_scores(CorpusLabel::Machine, vec![5.0, 6.0]);
        let metrics = RocMetrics::compute(&human, &machine);
        EvaluationRecord::new(
            WatermarkConfig::new(SchemeId::Rolling3),
            64,
            0.0,
            &human,
            &machine,
            metrics,
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_record_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let record = record();
        let path = record.write_json(dir.path()).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("eval_"));

        let back = EvaluationRecord::read_json(&path).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.vocab_size, 64);
        assert!((back.metrics.auroc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_reflects_population() {
        let population =
            ScorePopulation::from_scores(CorpusLabel::Machine, vec![1.0, 2.0, 3.0]);
        let summary = CorpusSummary::from_population(&population);
        assert_eq!(summary.scored, 3);
        assert_eq!(summary.undetectable, 0);
        assert_eq!(summary.mean_z, Some(2.0));
    }
}
