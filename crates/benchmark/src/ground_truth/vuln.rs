//! Vulnerability detection samples (PrimeVul-style JSONL).

use std::path::Path;

use agentgreen_core::BinaryLabel;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::Result;

/// One function under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnSample {
  /// Dataset index. Missing values are filled with the sample's position among
  /// the loaded samples, so skipped lines do not count.
  #[serde(default)]
  pub idx: Option<u64>,
  #[serde(default)]
  pub project: String,
  #[serde(default)]
  pub commit_id: String,
  pub func: String,
  /// 1 = vulnerable, 0 = benign
  pub target: u8,
  #[serde(default, deserialize_with = "string_or_list")]
  pub cwe: Vec<String>,
  #[serde(default)]
  pub cve: Option<String>,
}

impl VulnSample {
  pub fn label(&self) -> BinaryLabel {
    BinaryLabel::from_bool(self.target == 1)
  }
}

/// Datasets carry `cwe` either as a list or a single string.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => vec![s],
    Value::Array(items) => items
      .into_iter()
      .map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
      })
      .collect(),
    _ => Vec::new(),
  })
}

/// Load samples line by line.
///
/// Lines that are not valid JSON, lack `func`/`target`, or carry a target other
/// than 0/1 are skipped with a warning; the remaining samples keep file order.
pub fn load_vuln_samples(path: &Path) -> Result<Vec<VulnSample>> {
  let content = std::fs::read_to_string(path)?;

  let mut samples = Vec::new();
  for (line_no, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let mut sample: VulnSample = match serde_json::from_str(line) {
      Ok(sample) => sample,
      Err(e) => {
        warn!(line = line_no + 1, err = %e, "Skipping malformed vulnerability sample");
        continue;
      }
    };
    if sample.target > 1 {
      warn!(line = line_no + 1, target = sample.target, "Skipping sample with non-binary target");
      continue;
    }
    sample.idx.get_or_insert(samples.len() as u64);
    samples.push(sample);
  }

  info!(count = samples.len(), path = %path.display(), "Loaded vulnerability samples");
  Ok(samples)
}
