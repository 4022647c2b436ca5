//! Report generation for evaluation runs.
//!
//! - Tables: fixed-column CSVs per task, plus normalized dumps and completions
//! - JSON: machine-readable run report for comparison and leaderboards
//! - Comparison: regression detection between two runs of one task
//! - Leaderboard: Markdown ranking of designs per task

mod comparison;
mod json;
mod leaderboard;
pub mod tables;

pub use comparison::{ComparisonReport, ComparisonSummary, MetricChange};
pub use json::{Metric, ReportMetadata, RunContext, RunReport, TaskSummary};
pub use leaderboard::Leaderboard;
