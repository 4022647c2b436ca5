//! Invariants every normalizer and scorer must hold for arbitrary input.

mod common;

use agentgreen_core::{BinaryLabel, SmellLabel};
use benchmark::metrics::{ConfusionMatrix, evaluate_parsing, pairwise_metrics};
use benchmark::normalize::{normalize_log_analysis_result, normalize_td_label, normalize_template};
use benchmark::verdict::extract_vulnerability_decision;
use common::{HDFS_RAW_OUTPUT, HDFS_TEMPLATE};
use pretty_assertions::assert_eq;

const NOISY_INPUTS: &[&str] = &[
  "",
  "   ",
  "asdkjh qwe zxc",
  "```\n```",
  "<|im_start|>assistant<|im_end|>",
  "REJECTED||",
  "APPROVED|9|",
  "Label: 7",
  "The smell is 12 or maybe 0",
  "💥🔥 nothing here",
  "{\"decision\": }",
];

#[test]
fn test_td_label_stays_in_alphabet() {
  let alphabet: Vec<&str> = SmellLabel::ALL.iter().map(|l| l.as_str()).collect();

  assert!(alphabet.contains(&normalize_td_label(None).as_str()));
  for input in NOISY_INPUTS {
    let label = normalize_td_label(Some(input));
    assert!(alphabet.contains(&label.as_str()), "{input:?} produced {label}");
  }
}

#[test]
fn test_td_critic_markers() {
  assert_eq!(normalize_td_label(Some("REJECTED|3|bad reasoning")).as_str(), "3");
  assert_eq!(normalize_td_label(Some("APPROVED|1|")).as_str(), "1");
}

#[test]
fn test_log_analysis_binary_fallback() {
  assert_eq!(
    normalize_log_analysis_result(Some("The session looks anomalous due to a crash.")).as_str(),
    "1"
  );
  assert_eq!(normalize_log_analysis_result(Some("Nothing unusual, routine heartbeat.")).as_str(), "0");
  assert_eq!(normalize_log_analysis_result(Some("")).as_str(), "0");
  assert_eq!(normalize_log_analysis_result(None).as_str(), "0");

  for input in NOISY_INPUTS {
    let label = normalize_log_analysis_result(Some(input));
    assert!(matches!(label, BinaryLabel::Negative | BinaryLabel::Positive));
  }
}

#[test]
fn test_vote_rule_requires_strict_majority() {
  let tie = extract_vulnerability_decision(Some(r#"[{"decision":"valid"}, {"decision":"partially valid"}]"#));
  assert_eq!(tie.vulnerable, BinaryLabel::Negative);

  let majority = extract_vulnerability_decision(Some(
    r#"[{"decision":"valid"}, {"decision":"valid"}, {"decision":"invalid"}]"#,
  ));
  assert_eq!(majority.vulnerable, BinaryLabel::Positive);
}

#[test]
fn test_decision_extraction_never_fails() {
  for input in NOISY_INPUTS {
    let decision = extract_vulnerability_decision(Some(input));
    assert!(!decision.reasoning.is_empty());
  }
  assert!(extract_vulnerability_decision(None).is_fallback());
}

#[test]
fn test_template_normalization_is_idempotent() {
  let clean = [
    HDFS_TEMPLATE,
    "PacketResponder <*> for block <*> terminating",
    "Receiving block <*> src: /<*>:<*> dest: /<*>:<*>",
    "Verification succeeded for <*>",
  ];
  for template in clean {
    let once = normalize_template(template);
    assert_eq!(once, template);
    assert_eq!(normalize_template(&once), once);
  }
}

#[test]
fn test_end_to_end_template() {
  assert_eq!(normalize_template(HDFS_RAW_OUTPUT), HDFS_TEMPLATE);

  let eval = evaluate_parsing(&[normalize_template(HDFS_RAW_OUTPUT)], &[HDFS_TEMPLATE.to_string()]).unwrap();
  assert!((eval.summary.parsing_accuracy - 1.0).abs() < f64::EPSILON);
  assert!((eval.summary.average_edit_similarity - 1.0).abs() < f64::EPSILON);
}

/// Deterministic label sequence covering every predicted/actual combination.
fn label_batch(len: usize, stride: usize) -> Vec<BinaryLabel> {
  (0..len)
    .map(|i| BinaryLabel::from_bool((i * stride + i / 3) % 5 < 2))
    .collect()
}

#[test]
fn test_confusion_counts_cover_batch() {
  for len in [0, 1, 7, 40, 101] {
    let predicted = label_batch(len, 3);
    let actual = label_batch(len, 7);

    let confusion = ConfusionMatrix::from_pairs(
      predicted
        .iter()
        .zip(&actual)
        .map(|(p, a)| (p.is_positive(), a.is_positive())),
    );
    assert_eq!(confusion.tp + confusion.fp + confusion.tn + confusion.fn_, len);

    let pairwise = pairwise_metrics(&predicted, &actual);
    if len > 0 {
      assert!((pairwise.p_c + pairwise.p_r - 100.0).abs() < 1e-9);
    } else {
      assert_eq!(pairwise.p_c + pairwise.p_r, 0.0);
    }
  }
}
