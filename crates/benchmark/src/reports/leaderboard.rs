//! Markdown leaderboard ranking designs within each task.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use agentgreen_core::Task;
use chrono::Utc;

use super::json::RunReport;
use crate::Result;

/// Leaderboard over any number of run reports.
pub struct Leaderboard {
  content: String,
}

impl Leaderboard {
  pub fn from_reports(reports: &[RunReport]) -> Self {
    let mut by_task: BTreeMap<&'static str, Vec<&RunReport>> = BTreeMap::new();
    for report in reports {
      by_task.entry(report.task().as_str()).or_default().push(report);
    }

    let mut content = String::new();
    let _ = writeln!(content, "# Design Leaderboard");
    let _ = writeln!(content);
    let _ = writeln!(content, "**Generated:** {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(content, "**Runs:** {}", reports.len());
    let _ = writeln!(content);

    for runs in by_task.into_values() {
      Self::write_task_table(&mut content, runs);
    }

    Self { content }
  }

  fn write_task_table(out: &mut String, mut runs: Vec<&RunReport>) {
    let Some(first) = runs.first() else {
      return;
    };
    let task: Task = first.task();
    let columns: Vec<&'static str> = first.summary.metrics().iter().map(|(name, _, _)| *name).collect();

    runs.sort_by(|a, b| {
      let score = |r: &RunReport| r.summary.headline().map(|(_, v)| v).unwrap_or(0.0);
      score(*b).total_cmp(&score(*a))
    });

    let _ = writeln!(out, "## {task}");
    let _ = writeln!(out);
    let mut header = String::from("| Rank | Design | Model |");
    let mut rule = String::from("|------|--------|-------|");
    for column in &columns {
      let _ = write!(header, " {column} |");
      rule.push_str(&format!("{}|", "-".repeat(column.len() + 2)));
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");

    for (rank, run) in runs.iter().enumerate() {
      let values: BTreeMap<&str, f64> = run
        .summary
        .metrics()
        .into_iter()
        .map(|(name, value, _)| (name, value))
        .collect();
      let mut row = format!("| {} | {} | {} |", rank + 1, run.label(), run.metadata.model);
      for column in &columns {
        match values.get(column) {
          Some(v) => {
            let _ = write!(row, " {v:.4} |");
          }
          None => row.push_str(" - |"),
        }
      }
      let _ = writeln!(out, "{row}");
    }
    let _ = writeln!(out);
  }

  pub fn as_str(&self) -> &str {
    &self.content
  }

  /// Save to a Markdown file.
  pub fn save(&self, path: &Path) -> Result<()> {
    std::fs::write(path, &self.content)?;
    Ok(())
  }
}
