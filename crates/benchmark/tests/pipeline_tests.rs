//! File-to-report pipeline tests: load fixtures, normalize, score, write outputs.
//!
//! Tests: log parsing end to end, technical debt with critic markers,
//! keyed log analysis with a missing block, review-board vulnerability verdicts.

mod common;

use agentgreen_core::{AgentPattern, Design, SmellLabel, Shot, TemplatePreset};
use benchmark::BenchmarkError;
use benchmark::ground_truth::{
  load_anomaly_ground_truth, load_debt_ground_truth, load_template_ground_truth, load_vuln_samples,
};
use benchmark::metrics::{evaluate_debt, evaluate_log_analysis, evaluate_parsing, evaluate_vulnerability};
use benchmark::normalize::{TemplateNormalizer, classify_log_analysis, classify_td_label, normalize_all};
use benchmark::reports::{RunContext, RunReport, TaskSummary, tables};
use benchmark::responses::{load_keyed_responses, load_responses};
use benchmark::verdict::extract_vulnerability_decision;
use common::{HDFS_RAW_OUTPUT, HDFS_TEMPLATE, workspace, write_fixture};
use pretty_assertions::assert_eq;

#[test]
fn test_log_parsing_end_to_end() {
  let (_temp, data, results) = workspace();
  let gt_path = write_fixture(
    &data,
    "HDFS_2k.log_structured.csv",
    &format!(
      "LineId,EventTemplate\n1,{HDFS_TEMPLATE}\n2,Receiving block <*> src: /<*> dest: /<*>\n"
    ),
  );
  let raw_path = write_fixture(
    &data,
    "raw.txt",
    &format!("{HDFS_RAW_OUTPUT}\nReceiving block <*> src: /<*>:<*> dest: /<*>:<*>\n"),
  );

  let ground_truth = load_template_ground_truth(&gt_path).unwrap();
  let responses = load_responses(&raw_path).unwrap();
  let normalizer = TemplateNormalizer::preset(TemplatePreset::Standard);
  let parsed = normalize_all(&responses, |r| normalizer.normalize(r.text().unwrap_or_default()));
  assert_eq!(parsed[0], HDFS_TEMPLATE);

  let templates: Vec<String> = ground_truth.iter().map(|e| e.event_template.clone()).collect();
  let eval = evaluate_parsing(&parsed, &templates).unwrap();
  assert!(eval.lines[0].is_correct);
  assert!(!eval.lines[1].is_correct);
  assert!((eval.summary.parsing_accuracy - 0.5).abs() < f64::EPSILON);
  assert_eq!(eval.summary.confusion.tp, 1);
  assert_eq!(eval.summary.confusion.fp, 1);

  let written = tables::write_parsing(&eval, &results, "log-parsing_SA-few").unwrap();
  assert_eq!(written.len(), 2);
  let per_line = std::fs::read_to_string(&written[0]).unwrap();
  assert!(per_line.starts_with(
    "Line Number,Parsed,Ground Truth,Edit Distance,Edit Similarity,LCS Length,LCS Similarity,Is Correct\n"
  ));
  assert!(per_line.contains(",True\n"));
  assert!(per_line.contains(",False\n"));
  let summary = std::fs::read_to_string(&written[1]).unwrap();
  assert!(summary.lines().nth(1).unwrap().starts_with("0.5,"));
}

#[test]
fn test_single_template_scores_perfectly() {
  let (_temp, data, results) = workspace();
  let gt_path = write_fixture(&data, "gt.csv", &format!("LineId,EventTemplate\n1,{HDFS_TEMPLATE}\n"));
  let raw_path = write_fixture(&data, "raw.txt", &format!("{HDFS_RAW_OUTPUT}\n"));

  let templates: Vec<String> = load_template_ground_truth(&gt_path)
    .unwrap()
    .into_iter()
    .map(|e| e.event_template)
    .collect();
  let normalizer = TemplateNormalizer::preset(TemplatePreset::Standard);
  let parsed: Vec<String> = load_responses(&raw_path)
    .unwrap()
    .iter()
    .map(|r| normalizer.normalize(r.text().unwrap_or_default()))
    .collect();

  let eval = evaluate_parsing(&parsed, &templates).unwrap();
  assert!((eval.summary.parsing_accuracy - 1.0).abs() < f64::EPSILON);
  assert!((eval.summary.average_edit_similarity - 1.0).abs() < f64::EPSILON);
  assert!((eval.summary.average_lcs_similarity - 1.0).abs() < f64::EPSILON);

  let report_path = results.join("log-parsing_SA-few_report.json");
  RunReport::new(
    RunContext {
      experiment: "log-parsing_SA-few".to_string(),
      design: Some(Design::new(AgentPattern::SingleAgent, Shot::Few)),
      model: "qwen3:4b-instruct".to_string(),
      preset: Some(TemplatePreset::Standard),
    },
    TaskSummary::parsing(&eval, 0),
    Default::default(),
  )
  .save(&report_path)
  .unwrap();

  let loaded = RunReport::load(&report_path).unwrap();
  assert_eq!(loaded.summary.headline(), Some(("parsing_accuracy", 1.0)));
}

#[test]
fn test_length_mismatch_is_an_error() {
  let (_temp, data, _results) = workspace();
  let gt_path = write_fixture(
    &data,
    "gt.csv",
    &format!("LineId,EventTemplate\n1,{HDFS_TEMPLATE}\n2,{HDFS_TEMPLATE}\n"),
  );
  let templates: Vec<String> = load_template_ground_truth(&gt_path)
    .unwrap()
    .into_iter()
    .map(|e| e.event_template)
    .collect();

  let result = evaluate_parsing(&[HDFS_TEMPLATE.to_string()], &templates);
  assert!(matches!(
    result,
    Err(BenchmarkError::LengthMismatch {
      predictions: 1,
      ground_truth: 2
    })
  ));
}

#[test]
fn test_technical_debt_pipeline() {
  let (_temp, data, results) = workspace();
  let gt_path = write_fixture(
    &data,
    "mlcq.csv",
    "smell;severity;code_snippet\n\
     blob;major;\"class Manager { void a() {} void b() {} }\"\n\
     long method;none;\"void run() { step(); }\"\n\
     feature envy;minor;\"int total(Order o) { return o.a() + o.b(); }\"\n",
  );
  let raw_path = write_fixture(&data, "raw.txt", "APPROVED|1|\nREJECTED|3|bad reasoning\nThe answer is 3\n");

  let ground_truth = load_debt_ground_truth(&gt_path).unwrap();
  let responses = load_responses(&raw_path).unwrap();
  let labels = normalize_all(&responses, |r| classify_td_label(r.text()));
  assert_eq!(
    labels.iter().map(|l| l.label).collect::<Vec<_>>(),
    vec![SmellLabel::Blob, SmellLabel::FeatureEnvy, SmellLabel::FeatureEnvy]
  );

  let eval = evaluate_debt(&ground_truth, &labels).unwrap();
  assert!((eval.accuracy - 2.0 / 3.0).abs() < 1e-9);
  assert_eq!(eval.confusion.total(), 3);
  assert_eq!(eval.confusion.tp, 2);
  assert_eq!(eval.confusion.fp, 1);
  assert_eq!(eval.fallbacks, 0);

  let written = tables::write_debt(&eval, &results, "td-detection_DA-few").unwrap();
  let per_line = std::fs::read_to_string(&written[0]).unwrap();
  assert!(per_line.starts_with("Line Number,Code Snippet,Ground Truth Label,Predicted Label,Is Correct\n"));
  assert!(per_line.contains("2,void run() { step(); },0,3,False"));
}

#[test]
fn test_log_analysis_keyed_by_block() {
  let (_temp, data, results) = workspace();
  let gt_path = write_fixture(
    &data,
    "anomaly_label.csv",
    "BlockId,Label\nblk_1,Anomaly\nblk_2,Normal\nblk_3,Normal\n",
  );
  let raw_path = write_fixture(
    &data,
    "raw.txt",
    "blk_2\tThe session looks normal\nblk_1\t1\nblk_9\t1\n",
  );

  let ground_truth = load_anomaly_ground_truth(&gt_path).unwrap();
  let responses = load_keyed_responses(&raw_path).unwrap();
  let predictions: Vec<_> = responses
    .iter()
    .map(|r| (r.key.clone().unwrap(), classify_log_analysis(r.text())))
    .collect();

  let eval = evaluate_log_analysis(&ground_truth, &predictions);
  assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
  assert_eq!(eval.missing, 1);
  assert_eq!(eval.unmatched, 1);
  assert_eq!(eval.fallbacks, 1);
  assert_eq!(eval.confusion.total(), ground_truth.len());

  let written = tables::write_log_analysis(&eval, &results, "log-analysis_MA-zero").unwrap();
  let per_block = std::fs::read_to_string(&written[0]).unwrap();
  assert!(per_block.starts_with("Block ID,Ground Truth Label,Predicted Label,Is Correct\n"));
  assert!(per_block.contains("blk_3,0,0,True"));
}

#[test]
fn test_vulnerability_board_pipeline() {
  let (_temp, data, results) = workspace();
  let samples_path = write_fixture(
    &data,
    "primevul_test.jsonl",
    r#"{"idx": 10, "project": "openssl", "commit_id": "a1", "func": "int f(char *p){ strcpy(buf, p); }", "target": 1}
{"idx": 11, "project": "curl", "commit_id": "b2", "func": "int g(){ return 0; }", "target": 0}
{"idx": 12, "project": "zlib", "commit_id": "c3", "func": "void h(){}", "target": 0}
"#,
  );
  let raw_path = write_fixture(
    &data,
    "raw.txt",
    r#"[{"decision": "valid"}, {"decision": "valid"}, {"decision": "invalid"}]
[{"decision": "valid"}, {"decision": "partially valid"}]
[{"vulnerability": "none", "decision": "reject", "severity": "low"}]
"#,
  );

  let samples = load_vuln_samples(&samples_path).unwrap();
  let responses = load_responses(&raw_path).unwrap();
  let decisions = normalize_all(&responses, |r| extract_vulnerability_decision(r.text()));

  let eval = evaluate_vulnerability(&samples, &decisions).unwrap();
  assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
  assert!((eval.pairwise.p_c - 100.0).abs() < 1e-9);
  assert!((eval.pairwise.p_c + eval.pairwise.p_r - 100.0).abs() < 1e-9);
  assert_eq!(eval.lines[0].index, 10);

  let written = tables::write_vulnerability(&eval, &results, "vuln-detection_MA-few").unwrap();
  assert_eq!(written.len(), 3);
  let metrics = std::fs::read_to_string(&written[1]).unwrap();
  assert!(metrics.contains("1.0000"));
}
