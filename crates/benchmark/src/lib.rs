//! Evaluation harness for agentgreen orchestration experiments.
//!
//! Turns raw LLM output into canonical labels or log templates and scores them
//! against ground truth.
//!
//! ## Key Concepts
//!
//! - **Ground Truth**: CSV/JSONL fixtures for each task, loaded fail-fast
//! - **Responses**: raw model outputs, one per item, absent responses kept as placeholders
//! - **Normalization**: rule-driven template cleanup and closed-alphabet label extraction
//! - **Verdicts**: vulnerability decisions from JSON review boards or free text
//! - **Metrics**: edit/LCS similarity, confusion matrices, pairwise VulTrial percentages
//! - **Reports**: fixed-column CSVs, a JSON run report, comparisons and a leaderboard

pub mod ground_truth;
pub mod metrics;
pub mod normalize;
pub mod reports;
pub mod responses;
pub mod verdict;

pub use ground_truth::{AnomalyEntry, DebtEntry, TemplateEntry, VulnSample};
pub use metrics::{
  AnomalyEvaluation, ConfusionMatrix, DebtEvaluation, PairwiseMetrics, ParsingEvaluation, VulnEvaluation,
};
pub use normalize::{Basis, Normalized, TemplateNormalizer};
pub use reports::{ComparisonReport, RunReport};
pub use responses::RawResponse;
pub use verdict::{Decision, DecisionBasis, KeywordMatch};

use std::path::PathBuf;

use agentgreen_core::Task;
use thiserror::Error;

/// Benchmark-specific errors
#[derive(Debug, Error)]
pub enum BenchmarkError {
  #[error("Column '{column}' not found in {}", .path.display())]
  MissingColumn { column: String, path: PathBuf },

  #[error("Length mismatch: {predictions} predictions for {ground_truth} ground-truth entries")]
  LengthMismatch { predictions: usize, ground_truth: usize },

  #[error("Invalid normalizer rule '{pattern}': {source}")]
  InvalidRule {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("Cannot compare a {baseline} report with a {current} report")]
  TaskMismatch { baseline: Task, current: Task },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BenchmarkError>;

/// Fail unless predictions and ground truth line up one to one.
pub(crate) fn ensure_aligned(predictions: usize, ground_truth: usize) -> Result<()> {
  if predictions != ground_truth {
    return Err(BenchmarkError::LengthMismatch {
      predictions,
      ground_truth,
    });
  }
  Ok(())
}
