//! Log parsing templates and log anomaly labels.

use std::path::Path;

use agentgreen_core::BinaryLabel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{open_csv, require_columns};
use crate::Result;

/// Expected template for one structured log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
  pub line_id: u64,
  pub event_template: String,
}

/// Expected label for one log session (HDFS block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEntry {
  pub block_id: String,
  pub label: BinaryLabel,
}

/// Load `LineId,EventTemplate` rows in file order.
///
/// Templates are kept verbatim since scoring is exact string comparison.
pub fn load_template_ground_truth(path: &Path) -> Result<Vec<TemplateEntry>> {
  let mut reader = open_csv(path, b',')?;
  let [line_col, template_col] = require_columns(reader.headers()?, ["LineId", "EventTemplate"], path)?;

  let mut entries = Vec::new();
  for (position, record) in reader.records().enumerate() {
    let record = record?;
    let line_id = match record.get(line_col).map(str::trim).and_then(|s| s.parse().ok()) {
      Some(id) => id,
      None => {
        warn!(position, "Unparseable LineId, using row position");
        position as u64 + 1
      }
    };
    entries.push(TemplateEntry {
      line_id,
      event_template: record.get(template_col).unwrap_or_default().to_string(),
    });
  }

  info!(count = entries.len(), path = %path.display(), "Loaded template ground truth");
  Ok(entries)
}

/// Load `BlockId,Label` rows. A label of `Anomaly` (any case) is positive, anything else negative.
pub fn load_anomaly_ground_truth(path: &Path) -> Result<Vec<AnomalyEntry>> {
  let mut reader = open_csv(path, b',')?;
  let [block_col, label_col] = require_columns(reader.headers()?, ["BlockId", "Label"], path)?;

  let mut entries = Vec::new();
  for record in reader.records() {
    let record = record?;
    let block_id = record.get(block_col).unwrap_or_default().trim().to_string();
    if block_id.is_empty() {
      debug!("Skipping row without BlockId");
      continue;
    }
    let label = record.get(label_col).unwrap_or_default().trim();
    entries.push(AnomalyEntry {
      block_id,
      label: BinaryLabel::from_bool(label.eq_ignore_ascii_case("anomaly")),
    });
  }

  info!(count = entries.len(), path = %path.display(), "Loaded log analysis ground truth");
  Ok(entries)
}
