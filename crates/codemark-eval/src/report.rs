//! Fixed-format reporting artifacts.
//!
//! Two outputs per configuration: a minimal four-value metrics file that
//! downstream tooling parses positionally, and an appendable summary table
//! that collects one row per (scheme, attack ratio) across a sweep.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use codemark_core::Result;
use serde::{Deserialize, Serialize};

use crate::metrics::RocMetrics;

/// Write the positional metrics artifact: AUROC, TPR@0%, TPR@1%, TPR@5%,
/// one value per line.
pub fn write_metrics_file(path: &Path, metrics: &RocMetrics) -> Result<()> {
    let body = format!(
        "{:.6}\n{:.6}\n{:.6}\n{:.6}\n",
        metrics.auroc, metrics.tpr_at_0, metrics.tpr_at_1, metrics.tpr_at_5
    );
    fs::write(path, body)?;
    Ok(())
}

/// One line of the cross-configuration summary table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    /// Seeding-scheme name (the "method" column).
    pub method: String,
    /// Rename ratio of the attacked machine corpus.
    pub ratio: f64,
    /// Metrics for this configuration.
    pub metrics: RocMetrics,
}

impl SweepRow {
    /// Format as a paper-ready table row.
    #[must_use]
    pub fn to_table_row(&self) -> String {
        format!(
            "| {:<20} | {:>5.2} | {:>7.4} | {:>7.4} | {:>7.4} | {:>7.4} |",
            self.method,
            self.ratio,
            self.metrics.auroc,
            self.metrics.tpr_at_0,
            self.metrics.tpr_at_1,
            self.metrics.tpr_at_5,
        )
    }

    /// Format the full table header.
    #[must_use]
    pub fn table_header() -> String {
        format!(
            "| {:<20} | {:>5} | {:>7} | {:>7} | {:>7} | {:>7} |",
            "Method", "Ratio", "AUROC", "TPR@0%", "TPR@1%", "TPR@5%"
        )
    }

    /// Format the table separator.
    #[must_use]
    pub fn table_separator() -> String {
        format!(
            "|{:-<22}|{:->7}|{:->9}|{:->9}|{:->9}|{:->9}|",
            "", "", "", "", "", ""
        )
    }
}

/// Append a sweep row to the summary table at `path`, writing the header
/// first if the file does not exist yet.
pub fn append_summary_row(path: &Path, row: &SweepRow) -> Result<()> {
    let is_new = !path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if is_new {
        writeln!(file, "{}", SweepRow::table_header())?;
        writeln!(file, "{}", SweepRow::table_separator())?;
    }
    writeln!(file, "{}", row.to_table_row())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> RocMetrics {
        RocMetrics {
            auroc: 0.9876,
            tpr_at_0: 0.8,
            tpr_at_1: 0.85,
            tpr_at_5: 0.95,
        }
    }

    #[test]
    fn test_metrics_file_is_four_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");
        write_metrics_file(&path, &metrics()).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let values: Vec<f64> = body
            .lines()
            .map(|line| line.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 4);
        assert!((values[0] - 0.9876).abs() < 1e-9);
        assert!((values[3] - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_table_row_formatting() {
        let row = SweepRow {
            method: "rolling_3".to_string(),
            ratio: 0.5,
            metrics: metrics(),
        };
        let rendered = row.to_table_row();
        assert!(rendered.contains("rolling_3"));
        assert!(rendered.contains("0.9876"));
        assert_eq!(
            rendered.matches('|').count(),
            SweepRow::table_header().matches('|').count()
        );
    }

    #[test]
    fn test_summary_appends_with_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        let row = SweepRow {
            method: "unigram".to_string(),
            ratio: 0.0,
            metrics: metrics(),
        };
        append_summary_row(&path, &row).unwrap();
        append_summary_row(&path, &row).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.matches("Method").count(), 1);
        assert_eq!(body.matches("unigram").count(), 2);
    }
}
