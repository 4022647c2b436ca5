//! Scoring of normalized predictions against ground truth.
//!
//! - Similarity: Levenshtein distance and Ratcliff/Obershelp matching blocks
//! - Parsing: per-template edit/LCS similarity and batch averages
//! - Classification: confusion matrices for technical debt and log anomalies
//! - Pairwise: vulnerability verdicts with VulTrial percentages

pub mod classification;
pub mod pairwise;
pub mod parsing;
pub mod similarity;

pub use classification::{
  AnomalyEvaluation, AnomalyLine, ConfusionMatrix, DebtEvaluation, DebtLine, evaluate_debt, evaluate_log_analysis,
  label_distribution,
};
pub use pairwise::{PairwiseMetrics, VulnEvaluation, VulnLine, evaluate_vulnerability, pairwise_metrics};
pub use parsing::{LineMetrics, ParsingEvaluation, ParsingSummary, evaluate_parsing};
pub use similarity::{lcs_length, levenshtein, matching_blocks};
