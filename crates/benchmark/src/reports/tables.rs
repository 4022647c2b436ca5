//! Fixed-column CSV outputs, one set per task.
//!
//! Column names and order are consumed by downstream notebooks and must not
//! change. Booleans are written as `True`/`False`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::metrics::{AnomalyEvaluation, DebtEvaluation, ParsingEvaluation, VulnEvaluation};

fn bool_str(value: bool) -> &'static str {
  if value { "True" } else { "False" }
}

fn round4(value: f64) -> f64 {
  (value * 1e4).round() / 1e4
}

/// Serialize `rows` to `dir/{exp}_{suffix}` with a header line.
fn write_rows<R: Serialize>(dir: &Path, exp: &str, suffix: &str, rows: impl IntoIterator<Item = R>) -> Result<PathBuf> {
  std::fs::create_dir_all(dir)?;
  let path = dir.join(format!("{exp}_{suffix}"));
  let mut writer = csv::Writer::from_path(&path)?;
  for row in rows {
    writer.serialize(row)?;
  }
  writer.flush()?;
  info!(path = %path.display(), "Saved {suffix}");
  Ok(path)
}

// ============================================================================
// Log parsing
// ============================================================================

#[derive(Serialize)]
struct ParsingLineRow<'a> {
  #[serde(rename = "Line Number")]
  line_number: usize,
  #[serde(rename = "Parsed")]
  parsed: &'a str,
  #[serde(rename = "Ground Truth")]
  ground_truth: &'a str,
  #[serde(rename = "Edit Distance")]
  edit_distance: usize,
  #[serde(rename = "Edit Similarity")]
  edit_similarity: f64,
  #[serde(rename = "LCS Length")]
  lcs_length: usize,
  #[serde(rename = "LCS Similarity")]
  lcs_similarity: f64,
  #[serde(rename = "Is Correct")]
  is_correct: &'static str,
}

#[derive(Serialize)]
struct ParsingSummaryRow {
  #[serde(rename = "Parsing Accuracy")]
  parsing_accuracy: f64,
  #[serde(rename = "Average Edit Similarity")]
  average_edit_similarity: f64,
  #[serde(rename = "Average LCS Similarity")]
  average_lcs_similarity: f64,
  #[serde(rename = "Average Edit Distance")]
  average_edit_distance: f64,
  #[serde(rename = "Average LCS Length")]
  average_lcs_length: f64,
}

/// `{exp}_per_line_metrics.csv` and `{exp}_summary_metrics.csv`.
pub fn write_parsing(eval: &ParsingEvaluation, dir: &Path, exp: &str) -> Result<Vec<PathBuf>> {
  let per_line = write_rows(
    dir,
    exp,
    "per_line_metrics.csv",
    eval.lines.iter().map(|l| ParsingLineRow {
      line_number: l.line_number,
      parsed: &l.parsed,
      ground_truth: &l.ground_truth,
      edit_distance: l.edit_distance,
      edit_similarity: round4(l.edit_similarity),
      lcs_length: l.lcs_length,
      lcs_similarity: round4(l.lcs_similarity),
      is_correct: bool_str(l.is_correct),
    }),
  )?;

  let s = &eval.summary;
  let summary = write_rows(
    dir,
    exp,
    "summary_metrics.csv",
    [ParsingSummaryRow {
      parsing_accuracy: s.parsing_accuracy,
      average_edit_similarity: s.average_edit_similarity,
      average_lcs_similarity: s.average_lcs_similarity,
      average_edit_distance: s.average_edit_distance,
      average_lcs_length: s.average_lcs_length,
    }],
  )?;

  Ok(vec![per_line, summary])
}

// ============================================================================
// Technical debt
// ============================================================================

#[derive(Serialize)]
struct DebtLineRow<'a> {
  #[serde(rename = "Line Number")]
  line_number: usize,
  #[serde(rename = "Code Snippet")]
  code_snippet: &'a str,
  #[serde(rename = "Ground Truth Label")]
  ground_truth: &'static str,
  #[serde(rename = "Predicted Label")]
  predicted: &'static str,
  #[serde(rename = "Is Correct")]
  is_correct: &'static str,
}

#[derive(Serialize)]
struct ConfusionRow {
  #[serde(rename = "Accuracy")]
  accuracy: f64,
  #[serde(rename = "TP")]
  tp: usize,
  #[serde(rename = "FP")]
  fp: usize,
  #[serde(rename = "TN")]
  tn: usize,
  #[serde(rename = "FN")]
  fn_: usize,
}

/// `{exp}_per_line_metrics.csv` and `{exp}_summary_metrics.csv`.
pub fn write_debt(eval: &DebtEvaluation, dir: &Path, exp: &str) -> Result<Vec<PathBuf>> {
  let per_line = write_rows(
    dir,
    exp,
    "per_line_metrics.csv",
    eval.lines.iter().map(|l| DebtLineRow {
      line_number: l.line_number,
      code_snippet: &l.code_snippet,
      ground_truth: l.ground_truth.as_str(),
      predicted: l.predicted.as_str(),
      is_correct: bool_str(l.is_correct),
    }),
  )?;

  let c = eval.confusion;
  let summary = write_rows(
    dir,
    exp,
    "summary_metrics.csv",
    [ConfusionRow {
      accuracy: eval.accuracy,
      tp: c.tp,
      fp: c.fp,
      tn: c.tn,
      fn_: c.fn_,
    }],
  )?;

  Ok(vec![per_line, summary])
}

// ============================================================================
// Log anomaly analysis
// ============================================================================

#[derive(Serialize)]
struct AnomalyLineRow<'a> {
  #[serde(rename = "Block ID")]
  block_id: &'a str,
  #[serde(rename = "Ground Truth Label")]
  ground_truth: &'static str,
  #[serde(rename = "Predicted Label")]
  predicted: &'static str,
  #[serde(rename = "Is Correct")]
  is_correct: &'static str,
}

#[derive(Serialize)]
struct AnomalySummaryRow {
  #[serde(rename = "Accuracy")]
  accuracy: f64,
  #[serde(rename = "Precision")]
  precision: f64,
  #[serde(rename = "Recall")]
  recall: f64,
  #[serde(rename = "F1")]
  f1: f64,
  #[serde(rename = "TP")]
  tp: usize,
  #[serde(rename = "FP")]
  fp: usize,
  #[serde(rename = "TN")]
  tn: usize,
  #[serde(rename = "FN")]
  fn_: usize,
}

/// `{exp}_per_block_metrics.csv` and `{exp}_summary_metrics.csv`.
pub fn write_log_analysis(eval: &AnomalyEvaluation, dir: &Path, exp: &str) -> Result<Vec<PathBuf>> {
  let per_block = write_rows(
    dir,
    exp,
    "per_block_metrics.csv",
    eval.lines.iter().map(|l| AnomalyLineRow {
      block_id: &l.block_id,
      ground_truth: l.ground_truth.as_str(),
      predicted: l.predicted.as_str(),
      is_correct: bool_str(l.is_correct),
    }),
  )?;

  let c = eval.confusion;
  let summary = write_rows(
    dir,
    exp,
    "summary_metrics.csv",
    [AnomalySummaryRow {
      accuracy: eval.accuracy,
      precision: eval.precision,
      recall: eval.recall,
      f1: eval.f1,
      tp: c.tp,
      fp: c.fp,
      tn: c.tn,
      fn_: c.fn_,
    }],
  )?;

  Ok(vec![per_block, summary])
}

// ============================================================================
// Vulnerability detection
// ============================================================================

#[derive(Serialize)]
struct VulnLineRow<'a> {
  #[serde(rename = "Index")]
  index: u64,
  #[serde(rename = "Project")]
  project: &'a str,
  #[serde(rename = "Commit ID")]
  commit_id: &'a str,
  #[serde(rename = "Ground Truth")]
  ground_truth: u8,
  #[serde(rename = "Predicted")]
  predicted: u8,
  #[serde(rename = "Is Correct")]
  is_correct: &'static str,
  #[serde(rename = "Reasoning")]
  reasoning: &'a str,
}

#[derive(Serialize)]
struct VulnMetricsRow {
  #[serde(rename = "Accuracy")]
  accuracy: String,
  #[serde(rename = "TP")]
  tp: usize,
  #[serde(rename = "FP")]
  fp: usize,
  #[serde(rename = "TN")]
  tn: usize,
  #[serde(rename = "FN")]
  fn_: usize,
}

#[derive(Serialize)]
struct PairwiseRow {
  #[serde(rename = "P-C")]
  p_c: f64,
  #[serde(rename = "P-V")]
  p_v: f64,
  #[serde(rename = "P-B")]
  p_b: f64,
  #[serde(rename = "P-R")]
  p_r: f64,
  #[serde(rename = "FPR")]
  fpr: f64,
}

/// `{exp}_detailed_results.csv`, `{exp}_metrics.csv` and `{exp}_pairwise_metrics.csv`.
pub fn write_vulnerability(eval: &VulnEvaluation, dir: &Path, exp: &str) -> Result<Vec<PathBuf>> {
  let detailed = write_rows(
    dir,
    exp,
    "detailed_results.csv",
    eval.lines.iter().map(|l| VulnLineRow {
      index: l.index,
      project: &l.project,
      commit_id: &l.commit_id,
      ground_truth: l.ground_truth.as_u8(),
      predicted: l.predicted.as_u8(),
      is_correct: bool_str(l.is_correct),
      reasoning: &l.reasoning,
    }),
  )?;

  let c = eval.confusion;
  let metrics = write_rows(
    dir,
    exp,
    "metrics.csv",
    [VulnMetricsRow {
      accuracy: format!("{:.4}", eval.accuracy),
      tp: c.tp,
      fp: c.fp,
      tn: c.tn,
      fn_: c.fn_,
    }],
  )?;

  let p = eval.pairwise;
  let pairwise = write_rows(
    dir,
    exp,
    "pairwise_metrics.csv",
    [PairwiseRow {
      p_c: p.p_c,
      p_v: p.p_v,
      p_b: p.p_b,
      p_r: p.p_r,
      fpr: p.fpr,
    }],
  )?;

  Ok(vec![detailed, metrics, pairwise])
}

// ============================================================================
// Plain outputs
// ============================================================================

/// `{exp}_normalized.txt`, one normalized item per line.
pub fn write_normalized(items: &[String], dir: &Path, exp: &str) -> Result<PathBuf> {
  std::fs::create_dir_all(dir)?;
  let path = dir.join(format!("{exp}_normalized.txt"));
  let mut out = BufWriter::new(File::create(&path)?);
  for item in items {
    writeln!(out, "{item}")?;
  }
  out.flush()?;
  info!(path = %path.display(), count = items.len(), "Saved normalized outputs");
  Ok(path)
}

#[derive(Serialize)]
struct Completion<'a> {
  task_id: &'a str,
  completion: &'a str,
}

/// `{exp}_completions.jsonl` with one `{task_id, completion}` record per problem.
pub fn write_completions(completions: &[(String, String)], dir: &Path, exp: &str) -> Result<PathBuf> {
  std::fs::create_dir_all(dir)?;
  let path = dir.join(format!("{exp}_completions.jsonl"));
  let mut out = BufWriter::new(File::create(&path)?);
  for (task_id, completion) in completions {
    serde_json::to_writer(&mut out, &Completion { task_id, completion })?;
    out.write_all(b"\n")?;
  }
  out.flush()?;
  info!(path = %path.display(), count = completions.len(), "Saved completions");
  Ok(path)
}
