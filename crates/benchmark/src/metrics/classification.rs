//! Classification scoring for technical-debt and log anomaly tasks.

use std::collections::{BTreeMap, HashMap};

use agentgreen_core::{BinaryLabel, SmellLabel};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ground_truth::{AnomalyEntry, DebtEntry};
use crate::normalize::Normalized;
use crate::{Result, ensure_aligned};

// ============================================================================
// Confusion Matrix
// ============================================================================

/// Binary confusion-matrix counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
  #[serde(rename = "TP")]
  pub tp: usize,
  #[serde(rename = "FP")]
  pub fp: usize,
  #[serde(rename = "TN")]
  pub tn: usize,
  #[serde(rename = "FN")]
  pub fn_: usize,
}

impl ConfusionMatrix {
  /// Build from aligned (predicted, actual) pairs.
  pub fn from_pairs(pairs: impl IntoIterator<Item = (bool, bool)>) -> Self {
    let mut matrix = Self::default();
    for (predicted, actual) in pairs {
      matrix.record(predicted, actual);
    }
    matrix
  }

  pub fn record(&mut self, predicted: bool, actual: bool) {
    match (predicted, actual) {
      (true, true) => self.tp += 1,
      (true, false) => self.fp += 1,
      (false, false) => self.tn += 1,
      (false, true) => self.fn_ += 1,
    }
  }

  pub fn total(&self) -> usize {
    self.tp + self.fp + self.tn + self.fn_
  }

  /// `(TP + TN) / total`, 0 for an empty matrix.
  pub fn accuracy(&self) -> f64 {
    ratio(self.tp + self.tn, self.total())
  }

  pub fn precision(&self) -> f64 {
    ratio(self.tp, self.tp + self.fp)
  }

  pub fn recall(&self) -> f64 {
    ratio(self.tp, self.tp + self.fn_)
  }

  pub fn f1(&self) -> f64 {
    let (p, r) = (self.precision(), self.recall());
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
  }
}

pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64
  }
}

/// Count how often each label was predicted.
pub fn label_distribution<L: ToString>(labels: impl IntoIterator<Item = L>) -> BTreeMap<String, usize> {
  let mut distribution = BTreeMap::new();
  for label in labels {
    *distribution.entry(label.to_string()).or_insert(0) += 1;
  }
  distribution
}

// ============================================================================
// Technical Debt
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtLine {
  /// 1-based position in the ground-truth file
  pub line_number: usize,
  pub code_snippet: String,
  pub ground_truth: SmellLabel,
  pub predicted: SmellLabel,
  pub is_correct: bool,
}

/// Technical-debt results at two granularities.
///
/// `accuracy` is exact category agreement. The confusion matrix is the
/// smell / no-smell binary view, so a Blob predicted as Feature Envy is a TP
/// there while still counting as wrong in `accuracy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtEvaluation {
  pub accuracy: f64,
  pub confusion: ConfusionMatrix,
  /// Predictions that fell back to the default label
  pub fallbacks: usize,
  pub lines: Vec<DebtLine>,
}

impl DebtEvaluation {
  pub fn distribution(&self) -> BTreeMap<String, usize> {
    label_distribution(self.lines.iter().map(|l| l.predicted))
  }
}

/// Score smell predictions against positional ground truth.
pub fn evaluate_debt(ground_truth: &[DebtEntry], predictions: &[Normalized<SmellLabel>]) -> Result<DebtEvaluation> {
  ensure_aligned(predictions.len(), ground_truth.len())?;

  let mut confusion = ConfusionMatrix::default();
  let mut correct = 0;
  let mut fallbacks = 0;
  let mut lines = Vec::with_capacity(ground_truth.len());

  for (idx, (entry, prediction)) in ground_truth.iter().zip(predictions).enumerate() {
    let expected = entry.label();
    let predicted = prediction.label;
    if prediction.is_fallback() {
      debug!(line = idx + 1, "No smell label found in response, defaulted to 0");
      fallbacks += 1;
    }

    confusion.record(predicted.is_smell(), expected.is_smell());
    let is_correct = predicted == expected;
    if is_correct {
      correct += 1;
    }

    lines.push(DebtLine {
      line_number: idx + 1,
      code_snippet: entry.code_snippet.clone(),
      ground_truth: expected,
      predicted,
      is_correct,
    });
  }

  Ok(DebtEvaluation {
    accuracy: ratio(correct, ground_truth.len()),
    confusion,
    fallbacks,
    lines,
  })
}

// ============================================================================
// Log Anomaly Analysis
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyLine {
  pub block_id: String,
  pub ground_truth: BinaryLabel,
  pub predicted: BinaryLabel,
  pub is_correct: bool,
}

/// Log anomaly results, joined on block id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyEvaluation {
  pub accuracy: f64,
  pub precision: f64,
  pub recall: f64,
  pub f1: f64,
  pub confusion: ConfusionMatrix,
  /// Ground-truth blocks without any prediction
  pub missing: usize,
  /// Predictions for blocks absent from the ground truth
  pub unmatched: usize,
  /// Predictions that fell back to the default label (missing blocks included)
  pub fallbacks: usize,
  pub lines: Vec<AnomalyLine>,
}

impl AnomalyEvaluation {
  pub fn distribution(&self) -> BTreeMap<String, usize> {
    label_distribution(self.lines.iter().map(|l| l.predicted))
  }
}

/// Score keyed anomaly predictions. Output follows ground-truth order.
///
/// When a block id is predicted more than once the first prediction is used.
pub fn evaluate_log_analysis(
  ground_truth: &[AnomalyEntry],
  predictions: &[(String, Normalized<BinaryLabel>)],
) -> AnomalyEvaluation {
  let mut by_block: HashMap<&str, Normalized<BinaryLabel>> = HashMap::with_capacity(predictions.len());
  for (block_id, prediction) in predictions {
    by_block.entry(block_id.as_str()).or_insert(*prediction);
  }

  let known: HashMap<&str, ()> = ground_truth.iter().map(|e| (e.block_id.as_str(), ())).collect();
  let unmatched = by_block.keys().filter(|k| !known.contains_key(*k)).count();
  if unmatched > 0 {
    warn!(unmatched, "Predictions for block ids not present in ground truth were ignored");
  }

  let mut confusion = ConfusionMatrix::default();
  let mut missing = 0;
  let mut fallbacks = 0;
  let mut lines = Vec::with_capacity(ground_truth.len());

  for entry in ground_truth {
    let prediction = match by_block.get(entry.block_id.as_str()) {
      Some(prediction) => *prediction,
      None => {
        warn!(block_id = %entry.block_id, "No prediction for block, defaulting to normal");
        missing += 1;
        Normalized::fallback(BinaryLabel::Negative)
      }
    };
    if prediction.is_fallback() {
      fallbacks += 1;
    }

    confusion.record(prediction.label.is_positive(), entry.label.is_positive());
    lines.push(AnomalyLine {
      block_id: entry.block_id.clone(),
      ground_truth: entry.label,
      predicted: prediction.label,
      is_correct: prediction.label == entry.label,
    });
  }

  AnomalyEvaluation {
    accuracy: confusion.accuracy(),
    precision: confusion.precision(),
    recall: confusion.recall(),
    f1: confusion.f1(),
    confusion,
    missing,
    unmatched,
    fallbacks,
    lines,
  }
}
