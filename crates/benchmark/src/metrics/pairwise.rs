//! Vulnerability detection scoring, including the VulTrial pairwise percentages.

use std::collections::BTreeMap;

use agentgreen_core::BinaryLabel;
use serde::{Deserialize, Serialize};

use super::classification::{ConfusionMatrix, label_distribution, ratio};
use crate::ground_truth::VulnSample;
use crate::verdict::Decision;
use crate::{Result, ensure_aligned};

/// Pairwise percentages on a 0-100 scale, stored unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairwiseMetrics {
  /// Correctly classified samples
  #[serde(rename = "P-C")]
  pub p_c: f64,
  /// Vulnerable samples classified vulnerable
  #[serde(rename = "P-V")]
  pub p_v: f64,
  /// Benign samples classified benign
  #[serde(rename = "P-B")]
  pub p_b: f64,
  /// Reversed classifications
  #[serde(rename = "P-R")]
  pub p_r: f64,
  /// False positive rate among benign samples
  #[serde(rename = "FPR")]
  pub fpr: f64,
}

/// Compute pairwise metrics over aligned labels. Empty classes score 0.
pub fn pairwise_metrics(predictions: &[BinaryLabel], ground_truth: &[BinaryLabel]) -> PairwiseMetrics {
  let pairs: Vec<(BinaryLabel, BinaryLabel)> = predictions.iter().copied().zip(ground_truth.iter().copied()).collect();
  let total = pairs.len();
  let agree = pairs.iter().filter(|(p, g)| p == g).count();

  let vulnerable = pairs.iter().filter(|(_, g)| g.is_positive()).count();
  let benign = total - vulnerable;
  let caught = pairs.iter().filter(|(p, g)| g.is_positive() && p.is_positive()).count();
  let cleared = pairs.iter().filter(|(p, g)| !g.is_positive() && !p.is_positive()).count();
  let false_alarms = benign - cleared;

  PairwiseMetrics {
    p_c: ratio(agree, total) * 100.0,
    p_v: ratio(caught, vulnerable) * 100.0,
    p_b: ratio(cleared, benign) * 100.0,
    p_r: ratio(total - agree, total) * 100.0,
    fpr: ratio(false_alarms, benign) * 100.0,
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnLine {
  /// Dataset index, or position when the sample had none
  pub index: u64,
  pub project: String,
  pub commit_id: String,
  pub ground_truth: BinaryLabel,
  pub predicted: BinaryLabel,
  pub is_correct: bool,
  pub reasoning: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnEvaluation {
  pub accuracy: f64,
  pub confusion: ConfusionMatrix,
  pub pairwise: PairwiseMetrics,
  /// Decisions that fell back to "not vulnerable"
  pub fallbacks: usize,
  pub lines: Vec<VulnLine>,
}

impl VulnEvaluation {
  pub fn distribution(&self) -> BTreeMap<String, usize> {
    label_distribution(self.lines.iter().map(|l| l.predicted))
  }
}

/// Score decisions against positional samples.
pub fn evaluate_vulnerability(samples: &[VulnSample], decisions: &[Decision]) -> Result<VulnEvaluation> {
  ensure_aligned(decisions.len(), samples.len())?;

  let lines: Vec<VulnLine> = samples
    .iter()
    .zip(decisions)
    .enumerate()
    .map(|(pos, (sample, decision))| VulnLine {
      // Same rule the loader applies to samples without an idx
      index: sample.idx.unwrap_or(pos as u64),
      project: sample.project.clone(),
      commit_id: sample.commit_id.clone(),
      ground_truth: sample.label(),
      predicted: decision.vulnerable,
      is_correct: sample.label() == decision.vulnerable,
      reasoning: decision.reasoning.clone(),
    })
    .collect();

  let predicted: Vec<BinaryLabel> = lines.iter().map(|l| l.predicted).collect();
  let actual: Vec<BinaryLabel> = lines.iter().map(|l| l.ground_truth).collect();
  let confusion = ConfusionMatrix::from_pairs(
    lines
      .iter()
      .map(|l| (l.predicted.is_positive(), l.ground_truth.is_positive())),
  );

  Ok(VulnEvaluation {
    accuracy: confusion.accuracy(),
    confusion,
    pairwise: pairwise_metrics(&predicted, &actual),
    fallbacks: decisions.iter().filter(|d| d.is_fallback()).count(),
    lines,
  })
}
