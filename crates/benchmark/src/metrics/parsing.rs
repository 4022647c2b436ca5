//! Log template scoring.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classification::{ConfusionMatrix, ratio};
use super::similarity::{edit_similarity, lcs_length, lcs_similarity, levenshtein};
use crate::{Result, ensure_aligned};

/// Scores for one parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMetrics {
  /// 1-based position in the ground-truth file
  pub line_number: usize,
  pub parsed: String,
  pub ground_truth: String,
  pub edit_distance: usize,
  pub edit_similarity: f64,
  pub lcs_length: usize,
  pub lcs_similarity: f64,
  pub is_correct: bool,
}

impl LineMetrics {
  pub fn score(line_number: usize, parsed: &str, ground_truth: &str) -> Self {
    let edit_distance = levenshtein(parsed, ground_truth);
    let lcs = lcs_length(parsed, ground_truth);
    Self {
      line_number,
      parsed: parsed.to_string(),
      ground_truth: ground_truth.to_string(),
      edit_distance,
      edit_similarity: edit_similarity(edit_distance, parsed, ground_truth),
      lcs_length: lcs,
      lcs_similarity: lcs_similarity(lcs, ground_truth),
      is_correct: parsed == ground_truth,
    }
  }
}

/// Batch averages. Every average is 0 for an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingSummary {
  pub parsing_accuracy: f64,
  pub average_edit_similarity: f64,
  pub average_lcs_similarity: f64,
  pub average_edit_distance: f64,
  pub average_lcs_length: f64,
  /// Exact matches are TP, everything else FP; TN and FN stay 0
  pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingEvaluation {
  pub summary: ParsingSummary,
  pub lines: Vec<LineMetrics>,
}

/// Score normalized templates against positional ground truth.
pub fn evaluate_parsing(parsed: &[String], ground_truth: &[String]) -> Result<ParsingEvaluation> {
  ensure_aligned(parsed.len(), ground_truth.len())?;

  let lines: Vec<LineMetrics> = parsed
    .iter()
    .zip(ground_truth)
    .enumerate()
    .map(|(idx, (p, gt))| {
      let line = LineMetrics::score(idx + 1, p, gt);
      debug!(
        line = line.line_number,
        edit_distance = line.edit_distance,
        lcs = line.lcs_length,
        correct = line.is_correct,
        "Scored template"
      );
      line
    })
    .collect();

  Ok(ParsingEvaluation {
    summary: summarize(&lines),
    lines,
  })
}

fn summarize(lines: &[LineMetrics]) -> ParsingSummary {
  if lines.is_empty() {
    return ParsingSummary::default();
  }

  let n = lines.len() as f64;
  let correct = lines.iter().filter(|l| l.is_correct).count();
  let confusion = ConfusionMatrix {
    tp: correct,
    fp: lines.len() - correct,
    ..Default::default()
  };

  ParsingSummary {
    parsing_accuracy: ratio(correct, lines.len()),
    average_edit_similarity: lines.iter().map(|l| l.edit_similarity).sum::<f64>() / n,
    average_lcs_similarity: lines.iter().map(|l| l.lcs_similarity).sum::<f64>() / n,
    average_edit_distance: lines.iter().map(|l| l.edit_distance as f64).sum::<f64>() / n,
    average_lcs_length: lines.iter().map(|l| l.lcs_length as f64).sum::<f64>() / n,
    confusion,
  }
}
