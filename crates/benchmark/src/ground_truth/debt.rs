//! Technical-debt (code smell) ground truth from the MLCQ export.

use std::path::Path;

use agentgreen_core::SmellLabel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{open_csv, require_columns};
use crate::Result;

/// One labelled code sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtEntry {
  pub smell: String,
  pub severity: String,
  pub code_snippet: String,
}

impl DebtEntry {
  /// Map smell and severity onto a single label.
  ///
  /// Severity `none` always means no smell; otherwise the smell name picks the
  /// label, and an unrecognised name also falls back to no smell.
  pub fn label(&self) -> SmellLabel {
    if self.severity.eq_ignore_ascii_case("none") {
      return SmellLabel::NoSmell;
    }
    SmellLabel::from_name(&self.smell).unwrap_or_default()
  }
}

/// Load `smell;severity;code_snippet` rows, skipping rows without a snippet.
pub fn load_debt_ground_truth(path: &Path) -> Result<Vec<DebtEntry>> {
  let mut reader = open_csv(path, b';')?;
  let [smell_col, severity_col, snippet_col] =
    require_columns(reader.headers()?, ["smell", "severity", "code_snippet"], path)?;

  let mut entries = Vec::new();
  let mut skipped = 0usize;
  for record in reader.records() {
    let record = record?;
    let field = |idx: usize| record.get(idx).unwrap_or_default().trim().to_string();

    let code_snippet = field(snippet_col);
    if code_snippet.is_empty() {
      skipped += 1;
      continue;
    }
    entries.push(DebtEntry {
      smell: field(smell_col),
      severity: field(severity_col),
      code_snippet,
    });
  }

  if skipped > 0 {
    debug!(skipped, "Skipped rows without a code snippet");
  }
  info!(count = entries.len(), path = %path.display(), "Loaded technical debt ground truth");
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn entry(smell: &str, severity: &str) -> DebtEntry {
    DebtEntry {
      smell: smell.to_string(),
      severity: severity.to_string(),
      code_snippet: "class A {}".to_string(),
    }
  }

  #[test]
  fn test_label_mapping() {
    assert_eq!(entry("blob", "major").label(), SmellLabel::Blob);
    assert_eq!(entry("feature envy", "minor").label(), SmellLabel::FeatureEnvy);
    assert_eq!(entry("long method", "None").label(), SmellLabel::NoSmell);
    assert_eq!(entry("god class", "critical").label(), SmellLabel::NoSmell);
  }

  #[test]
  fn test_load_handles_quoted_multiline_snippets() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mlcq.csv");
    std::fs::write(
      &path,
      "id;smell;severity;code_snippet\n\
       1;data class;major;\"public class Point {\n  int x; int y;\n}\"\n\
       2;blob;none;\n\
       3;long method;minor;void run() {}\n",
    )
    .unwrap();

    let entries = load_debt_ground_truth(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].code_snippet.contains("int x; int y;"));
    assert_eq!(entries[0].label(), SmellLabel::DataClass);
    assert_eq!(entries[1].label(), SmellLabel::LongMethod);
  }

  #[test]
  fn test_load_requires_columns() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mlcq.csv");
    std::fs::write(&path, "smell;code_snippet\nblob;x\n").unwrap();

    assert!(load_debt_ground_truth(&path).is_err());
  }
}
