//! Comparison and regression detection between two runs of the same task.

use std::fmt::Write as _;
use std::path::Path;

use agentgreen_core::Task;
use serde::{Deserialize, Serialize};

use super::json::RunReport;
use crate::{BenchmarkError, Result};

/// A metric that moved past the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricChange {
  pub metric: String,
  pub baseline: f64,
  pub current: f64,
  pub change_percent: f64,
  /// Whether this is a degradation
  pub is_degradation: bool,
}

/// Comparison report between two runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
  pub task: Task,
  /// Baseline run label (design or experiment)
  pub baseline: String,
  pub current: String,
  pub regressions: Vec<MetricChange>,
  pub improvements: Vec<MetricChange>,
  pub summary: ComparisonSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
  pub metrics_compared: usize,
  pub unchanged: usize,
  /// Whether the comparison passes (no significant regressions)
  pub passes: bool,
}

impl ComparisonReport {
  /// Compare two reports with a given threshold in percent.
  pub fn compare(baseline: &RunReport, current: &RunReport, threshold_percent: f64) -> Result<Self> {
    if baseline.task() != current.task() {
      return Err(BenchmarkError::TaskMismatch {
        baseline: baseline.task(),
        current: current.task(),
      });
    }

    let mut regressions = Vec::new();
    let mut improvements = Vec::new();
    let baseline_metrics = baseline.summary.metrics();
    let current_metrics = current.summary.metrics();

    for (name, current_value, higher_is_better) in &current_metrics {
      if let Some((_, baseline_value, _)) = baseline_metrics.iter().find(|(n, _, _)| n == name) {
        Self::compare_metric(
          name,
          *baseline_value,
          *current_value,
          threshold_percent,
          *higher_is_better,
          &mut regressions,
          &mut improvements,
        );
      }
    }

    let compared = current_metrics.len();
    let unchanged = compared.saturating_sub(regressions.len() + improvements.len());
    let passes = regressions.is_empty();

    Ok(Self {
      task: current.task(),
      baseline: baseline.label(),
      current: current.label(),
      regressions,
      improvements,
      summary: ComparisonSummary {
        metrics_compared: compared,
        unchanged,
        passes,
      },
    })
  }

  fn compare_metric(
    metric: &str,
    baseline: f64,
    current: f64,
    threshold: f64,
    higher_is_better: bool,
    regressions: &mut Vec<MetricChange>,
    improvements: &mut Vec<MetricChange>,
  ) {
    if baseline == 0.0 && current == 0.0 {
      return;
    }

    let change_percent = if baseline != 0.0 {
      ((current - baseline) / baseline) * 100.0
    } else if current > 0.0 {
      100.0
    } else {
      0.0
    };

    if change_percent.abs() < threshold {
      return;
    }

    let is_degradation = if higher_is_better {
      change_percent < 0.0
    } else {
      change_percent > 0.0
    };

    let change = MetricChange {
      metric: metric.to_string(),
      baseline,
      current,
      change_percent,
      is_degradation,
    };

    if is_degradation {
      regressions.push(change);
    } else {
      improvements.push(change);
    }
  }

  /// Load comparison between two report files.
  pub fn from_files(baseline_path: &Path, current_path: &Path, threshold: f64) -> Result<Self> {
    let baseline = RunReport::load(baseline_path)?;
    let current = RunReport::load(current_path)?;
    Self::compare(&baseline, &current, threshold)
  }

  /// Save comparison to JSON.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Generate markdown summary.
  pub fn to_markdown(&self) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {} Comparison", self.task);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Baseline:** {}", self.baseline);
    let _ = writeln!(out, "**Current:** {}", self.current);
    let _ = writeln!(out);

    let status = if self.summary.passes { "✅ PASS" } else { "❌ FAIL" };
    let _ = writeln!(out, "## Summary: {status}");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Compared | {} |", self.summary.metrics_compared);
    let _ = writeln!(out, "| Regressed | {} |", self.regressions.len());
    let _ = writeln!(out, "| Improved | {} |", self.improvements.len());
    let _ = writeln!(out, "| Unchanged | {} |", self.summary.unchanged);
    let _ = writeln!(out);

    Self::write_changes(&mut out, "## Regressions ❌", &self.regressions);
    Self::write_changes(&mut out, "## Improvements ✅", &self.improvements);

    out
  }

  fn write_changes(out: &mut String, heading: &str, changes: &[MetricChange]) {
    if changes.is_empty() {
      return;
    }
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Baseline | Current | Change |");
    let _ = writeln!(out, "|--------|----------|---------|--------|");
    for c in changes {
      let _ = writeln!(
        out,
        "| {} | {:.4} | {:.4} | {:+.1}% |",
        c.metric, c.baseline, c.current, c.change_percent
      );
    }
    let _ = writeln!(out);
  }
}
