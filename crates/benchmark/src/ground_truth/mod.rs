//! Ground truth loading for every benchmark task.
//!
//! Loaders fail fast on missing required columns: predictions are aligned to
//! these records by position or key, so a silently short dataset would skew
//! every metric downstream.

mod debt;
mod logs;
mod problems;
mod vuln;

pub use debt::{DebtEntry, load_debt_ground_truth};
pub use logs::{AnomalyEntry, TemplateEntry, load_anomaly_ground_truth, load_template_ground_truth};
pub use problems::{CodeProblem, load_code_problems};
pub use vuln::{VulnSample, load_vuln_samples};

use std::fs::File;
use std::path::Path;

use crate::{BenchmarkError, Result};

/// Open a delimited file with a header row.
fn open_csv(path: &Path, delimiter: u8) -> Result<csv::Reader<File>> {
  let reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .flexible(true)
    .from_path(path)?;
  Ok(reader)
}

/// Resolve the index of each required column, failing on the first one missing.
fn require_columns<const N: usize>(
  headers: &csv::StringRecord,
  required: [&str; N],
  path: &Path,
) -> Result<[usize; N]> {
  let mut indices = [0usize; N];
  for (slot, column) in indices.iter_mut().zip(required) {
    *slot = headers
      .iter()
      .position(|h| h.trim() == column)
      .ok_or_else(|| BenchmarkError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
      })?;
  }
  Ok(indices)
}
