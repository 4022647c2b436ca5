//! JSON run report: metadata plus the task-specific summary.

use std::collections::BTreeMap;
use std::path::Path;

use agentgreen_core::{Design, Task, TemplatePreset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::metrics::{
  AnomalyEvaluation, ConfusionMatrix, DebtEvaluation, PairwiseMetrics, ParsingEvaluation, ParsingSummary,
  VulnEvaluation,
};

/// Complete run report in JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
  pub metadata: ReportMetadata,
  pub summary: TaskSummary,
  /// How often each normalized label was produced (classification tasks)
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub distribution: BTreeMap<String, usize>,
}

/// What a run was and where it ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
  pub timestamp: DateTime<Utc>,
  /// Harness version
  pub version: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub git_commit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hostname: Option<String>,
  pub experiment: String,
  pub task: Task,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub design: Option<Design>,
  pub model: String,
  /// Template normalizer preset (log parsing only)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub preset: Option<TemplatePreset>,
}

/// Identity of a run, supplied by the caller.
#[derive(Debug, Clone)]
pub struct RunContext {
  pub experiment: String,
  pub design: Option<Design>,
  pub model: String,
  pub preset: Option<TemplatePreset>,
}

/// Task-specific headline numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "kebab-case")]
pub enum TaskSummary {
  LogParsing {
    summary: ParsingSummary,
    /// Responses that were absent or empty
    placeholders: usize,
  },
  TdDetection {
    accuracy: f64,
    confusion: ConfusionMatrix,
    fallbacks: usize,
  },
  LogAnalysis {
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1: f64,
    confusion: ConfusionMatrix,
    missing: usize,
    unmatched: usize,
    fallbacks: usize,
  },
  VulnDetection {
    accuracy: f64,
    confusion: ConfusionMatrix,
    pairwise: PairwiseMetrics,
    fallbacks: usize,
  },
  CodeGeneration {
    problems: usize,
    /// Completions per extraction source (`python_fence`, `definition`, ...)
    sources: BTreeMap<String, usize>,
  },
}

/// A comparable metric: name, value, and whether higher is better.
pub type Metric = (&'static str, f64, bool);

impl TaskSummary {
  pub fn parsing(eval: &ParsingEvaluation, placeholders: usize) -> Self {
    TaskSummary::LogParsing {
      summary: eval.summary.clone(),
      placeholders,
    }
  }

  pub fn debt(eval: &DebtEvaluation) -> Self {
    TaskSummary::TdDetection {
      accuracy: eval.accuracy,
      confusion: eval.confusion,
      fallbacks: eval.fallbacks,
    }
  }

  pub fn log_analysis(eval: &AnomalyEvaluation) -> Self {
    TaskSummary::LogAnalysis {
      accuracy: eval.accuracy,
      precision: eval.precision,
      recall: eval.recall,
      f1: eval.f1,
      confusion: eval.confusion,
      missing: eval.missing,
      unmatched: eval.unmatched,
      fallbacks: eval.fallbacks,
    }
  }

  pub fn vulnerability(eval: &VulnEvaluation) -> Self {
    TaskSummary::VulnDetection {
      accuracy: eval.accuracy,
      confusion: eval.confusion,
      pairwise: eval.pairwise,
      fallbacks: eval.fallbacks,
    }
  }

  pub fn task(&self) -> Task {
    match self {
      TaskSummary::LogParsing { .. } => Task::LogParsing,
      TaskSummary::TdDetection { .. } => Task::TdDetection,
      TaskSummary::LogAnalysis { .. } => Task::LogAnalysis,
      TaskSummary::VulnDetection { .. } => Task::VulnDetection,
      TaskSummary::CodeGeneration { .. } => Task::CodeGeneration,
    }
  }

  /// The metric designs are ranked by.
  pub fn headline(&self) -> Option<(&'static str, f64)> {
    self.metrics().first().map(|&(name, value, _)| (name, value))
  }

  /// Metrics tracked across runs, headline first.
  pub fn metrics(&self) -> Vec<Metric> {
    match self {
      TaskSummary::LogParsing { summary, .. } => vec![
        ("parsing_accuracy", summary.parsing_accuracy, true),
        ("average_edit_similarity", summary.average_edit_similarity, true),
        ("average_lcs_similarity", summary.average_lcs_similarity, true),
        ("average_edit_distance", summary.average_edit_distance, false),
      ],
      TaskSummary::TdDetection { accuracy, confusion, .. } => vec![
        ("accuracy", *accuracy, true),
        ("binary_f1", confusion.f1(), true),
      ],
      TaskSummary::LogAnalysis {
        accuracy,
        precision,
        recall,
        f1,
        ..
      } => vec![
        ("accuracy", *accuracy, true),
        ("f1", *f1, true),
        ("precision", *precision, true),
        ("recall", *recall, true),
      ],
      TaskSummary::VulnDetection { accuracy, pairwise, .. } => vec![
        ("accuracy", *accuracy, true),
        ("p_c", pairwise.p_c, true),
        ("p_v", pairwise.p_v, true),
        ("p_b", pairwise.p_b, true),
        ("fpr", pairwise.fpr, false),
      ],
      TaskSummary::CodeGeneration { .. } => Vec::new(),
    }
  }
}

impl RunReport {
  pub fn new(context: RunContext, summary: TaskSummary, distribution: BTreeMap<String, usize>) -> Self {
    Self {
      metadata: ReportMetadata {
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_commit: Self::get_git_commit(),
        hostname: hostname::get().ok().and_then(|h| h.into_string().ok()),
        experiment: context.experiment,
        task: summary.task(),
        design: context.design,
        model: context.model,
        preset: context.preset,
      },
      summary,
      distribution,
    }
  }

  pub fn task(&self) -> Task {
    self.summary.task()
  }

  /// Short label for tables: the design when known, else the experiment name.
  pub fn label(&self) -> String {
    match self.metadata.design {
      Some(design) => design.to_string(),
      None => self.metadata.experiment.clone(),
    }
  }

  fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
      .args(["rev-parse", "--short", "HEAD"])
      .output()
      .ok()
      .and_then(|o| String::from_utf8(o.stdout).ok())
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
  }

  /// Save report to a JSON file.
  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Load report from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    let report = serde_json::from_str(&json)?;
    Ok(report)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use agentgreen_core::{AgentPattern, Shot};
  use tempfile::TempDir;

  pub(crate) fn parsing_report(design: Design, accuracy: f64, edit_similarity: f64) -> RunReport {
    let summary = TaskSummary::LogParsing {
      summary: ParsingSummary {
        parsing_accuracy: accuracy,
        average_edit_similarity: edit_similarity,
        average_lcs_similarity: 0.9,
        average_edit_distance: 3.0,
        average_lcs_length: 40.0,
        confusion: ConfusionMatrix::default(),
      },
      placeholders: 0,
    };
    RunReport::new(
      RunContext {
        experiment: format!("log-parsing_{design}"),
        design: Some(design),
        model: "qwen3:4b-instruct".to_string(),
        preset: Some(TemplatePreset::Standard),
      },
      summary,
      BTreeMap::new(),
    )
  }

  #[test]
  fn test_headline_per_task() {
    let report = parsing_report(Design::new(AgentPattern::SingleAgent, Shot::Few), 0.75, 0.9);
    assert_eq!(report.task(), Task::LogParsing);
    assert_eq!(report.summary.headline(), Some(("parsing_accuracy", 0.75)));
    assert_eq!(report.label(), "SA-few");

    let codegen = TaskSummary::CodeGeneration {
      problems: 3,
      sources: BTreeMap::new(),
    };
    assert_eq!(codegen.headline(), None);
  }

  #[test]
  fn test_save_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("report.json");

    let mut report = parsing_report(Design::new(AgentPattern::MultiAgent, Shot::Zero), 0.5, 0.8);
    report.distribution.insert("0".to_string(), 2);
    report.save(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"task\": \"log-parsing\""));
    assert!(json.contains("\"design\": \"MA-zero\""));

    let loaded = RunReport::load(&path).unwrap();
    assert_eq!(loaded.task(), Task::LogParsing);
    assert_eq!(loaded.metadata.preset, Some(TemplatePreset::Standard));
    assert_eq!(loaded.summary.headline(), Some(("parsing_accuracy", 0.5)));
    assert_eq!(loaded.distribution.get("0"), Some(&2));
  }

  #[test]
  fn test_confusion_serializes_uppercase() {
    let summary = TaskSummary::TdDetection {
      accuracy: 0.5,
      confusion: ConfusionMatrix { tp: 1, fp: 2, tn: 3, fn_: 4 },
      fallbacks: 0,
    };
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["task"], "td-detection");
    assert_eq!(json["confusion"]["FN"], 4);
  }
}
