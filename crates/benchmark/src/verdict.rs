//! Vulnerability verdict extraction.
//!
//! Final-stage agents answer in one of these shapes:
//! - `{"vulnerability_detected": bool, "analysis": "..."}` (single/dual agent)
//! - `[{"vulnerability_detected": bool, ...}, ...]` (dual agent, one entry per finding)
//! - `[{"vulnerability": "...", "decision": "valid", ...}, ...]` (review board)
//! - free text
//!
//! Extraction never fails. Malformed JSON resolves to "not vulnerable" with the
//! parse error as reasoning.

use std::sync::LazyLock;

use agentgreen_core::BinaryLabel;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::normalize::text::unwrap_code_block;

// ============================================================================
// Keyword tables
// ============================================================================

static PARTIAL_VOTE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"partial|unclear|ambiguous").expect("Invalid partial vote regex"));

static INVALID_VOTE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"invalid|reject|\bnot\b|\bfalse\b|\bno\b").expect("Invalid invalid vote regex"));

static VALID_VOTE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"valid|accept|resolved|\btrue\b").expect("Invalid valid vote regex"));

/// Negated mentions ("not vulnerable", "no security issue"), removed only under [`KeywordMatch::NegationAware`].
static NEGATED_FINDING: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\b(?:not|no|non)[\s-]+(?:vulnerable|unsafe|security issues?)").expect("Invalid negation regex")
});

static FINDING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)vulnerable|unsafe|security issue").expect("Invalid finding regex"));

static DIRECT_NEGATIVE_PHRASE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)no vulnerabilit|\(2\)\s*no\b").expect("Invalid direct negative regex"));

static DIRECT_YES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\byes\b|vulnerability detected").expect("Invalid direct yes regex"));

static DIRECT_NO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bno\b").expect("Invalid direct no regex"));

static DIRECT_RISK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)unsafe|exploit|overflow").expect("Invalid direct risk regex"));

// ============================================================================
// Types
// ============================================================================

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
  /// Explicit `vulnerability_detected` field
  Detected,
  /// Majority rule over review-board verdicts
  Vote,
  /// Keyword search in free text
  Keyword,
  /// Nothing usable; conservative "not vulnerable"
  Fallback,
}

/// A binary vulnerability verdict with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
  pub vulnerable: BinaryLabel,
  pub reasoning: String,
  pub basis: DecisionBasis,
}

impl Decision {
  fn new(vulnerable: bool, reasoning: impl Into<String>, basis: DecisionBasis) -> Self {
    Self {
      vulnerable: BinaryLabel::from_bool(vulnerable),
      reasoning: reasoning.into(),
      basis,
    }
  }

  fn fallback(reasoning: impl Into<String>) -> Self {
    Self::new(false, reasoning, DecisionBasis::Fallback)
  }

  pub fn is_fallback(&self) -> bool {
    self.basis == DecisionBasis::Fallback
  }
}

/// How free-text answers are searched for finding keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeywordMatch {
  /// Any mention counts, so "not vulnerable" is a finding
  #[default]
  Substring,
  /// Negated mentions are dropped before the search
  NegationAware,
}

impl KeywordMatch {
  fn finds(self, text: &str) -> bool {
    match self {
      KeywordMatch::Substring => FINDING.is_match(text),
      KeywordMatch::NegationAware => FINDING.is_match(&NEGATED_FINDING.replace_all(text, "")),
    }
  }
}

/// One board member's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
  Valid,
  Invalid,
  Partial,
}

/// Classify a `decision` string. Partial beats invalid beats valid, so
/// "partially valid" and "invalid" never count as valid votes.
pub fn classify_vote(decision: &str) -> Option<Vote> {
  let decision = decision.to_lowercase();
  if PARTIAL_VOTE.is_match(&decision) {
    Some(Vote::Partial)
  } else if INVALID_VOTE.is_match(&decision) {
    Some(Vote::Invalid)
  } else if VALID_VOTE.is_match(&decision) {
    Some(Vote::Valid)
  } else {
    None
  }
}

/// Vote counts over a set of verdicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
  pub valid: usize,
  pub invalid: usize,
  pub partial: usize,
}

impl VoteTally {
  pub fn record(&mut self, vote: Vote) {
    match vote {
      Vote::Valid => self.valid += 1,
      Vote::Invalid => self.invalid += 1,
      Vote::Partial => self.partial += 1,
    }
  }

  /// Vulnerable iff valid votes strictly outnumber invalid and partial combined.
  pub fn is_vulnerable(&self) -> bool {
    self.valid > self.invalid + self.partial
  }
}

// ============================================================================
// Extraction
// ============================================================================

fn as_text(value: Option<&Value>, default: &str) -> String {
  match value {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Null) | None => default.to_string(),
    Some(other) => other.to_string(),
  }
}

fn detected_flag(value: &Value) -> bool {
  match value {
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
    Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
    _ => false,
  }
}

fn verdict_summary(verdict: &Map<String, Value>) -> String {
  format!(
    "{}: {} (severity: {}, action: {})",
    as_text(verdict.get("vulnerability"), "Unknown"),
    as_text(verdict.get("decision"), "?"),
    as_text(verdict.get("severity"), "N/A"),
    as_text(verdict.get("recommended_action"), "N/A"),
  )
}

fn analysis_text(object: &Map<String, Value>) -> Option<String> {
  object
    .get("analysis")
    .or_else(|| object.get("reasoning"))
    .map(|v| as_text(Some(v), ""))
}

fn from_object(object: &Map<String, Value>, raw: &str) -> Decision {
  if let Some(flag) = object.get("vulnerability_detected") {
    let reasoning = analysis_text(object).unwrap_or_else(|| raw.to_string());
    return Decision::new(detected_flag(flag), reasoning, DecisionBasis::Detected);
  }
  if object.contains_key("decision") {
    return from_verdicts(&[object], raw);
  }
  debug!("JSON object without a recognised decision field");
  Decision::fallback(analysis_text(object).unwrap_or_else(|| raw.to_string()))
}

fn from_verdicts(verdicts: &[&Map<String, Value>], raw: &str) -> Decision {
  let voted: Vec<_> = verdicts.iter().filter(|v| v.contains_key("decision")).collect();

  if voted.is_empty() {
    let flagged: Vec<_> = verdicts.iter().filter_map(|v| v.get("vulnerability_detected")).collect();
    if flagged.is_empty() {
      return Decision::fallback(raw);
    }
    let reasoning = verdicts
      .iter()
      .map(|v| analysis_text(v).unwrap_or_default())
      .collect::<Vec<_>>()
      .join("; ");
    return Decision::new(
      flagged.iter().any(|f| detected_flag(f)),
      reasoning,
      DecisionBasis::Detected,
    );
  }

  let mut tally = VoteTally::default();
  for verdict in &voted {
    if let Some(vote) = classify_vote(&as_text(verdict.get("decision"), "")) {
      tally.record(vote);
    }
  }
  let reasoning = voted.iter().map(|v| verdict_summary(v)).collect::<Vec<_>>().join("; ");
  debug!(
    valid = tally.valid,
    invalid = tally.invalid,
    partial = tally.partial,
    "Tallied board verdicts"
  );
  Decision::new(tally.is_vulnerable(), reasoning, DecisionBasis::Vote)
}

/// Turn a final-stage response into a verdict plus reasoning.
pub fn extract_vulnerability_decision(response: Option<&str>) -> Decision {
  extract_vulnerability_decision_with(response, KeywordMatch::default())
}

/// Like [`extract_vulnerability_decision`], with a choice of free-text keyword matching.
pub fn extract_vulnerability_decision_with(response: Option<&str>, keywords: KeywordMatch) -> Decision {
  let raw = response.map(str::trim).unwrap_or_default();
  if raw.is_empty() {
    return Decision::fallback("No response");
  }

  let body = unwrap_code_block(raw);
  if body.starts_with('{') || body.starts_with('[') {
    return match serde_json::from_str::<Value>(body) {
      Ok(Value::Object(object)) => from_object(&object, raw),
      Ok(Value::Array(items)) => {
        let verdicts: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
        from_verdicts(&verdicts, raw)
      }
      Ok(_) => Decision::fallback(raw),
      Err(e) => Decision::fallback(format!("Error parsing JSON decision: {e}")),
    };
  }

  if keywords.finds(raw) {
    Decision::new(true, raw, DecisionBasis::Keyword)
  } else {
    Decision::fallback(raw)
  }
}

/// Interpret a direct yes/no answer (no-agent and single-agent designs).
pub fn parse_direct_answer(response: Option<&str>) -> Decision {
  let raw = response.map(str::trim).unwrap_or_default();
  if raw.is_empty() {
    return Decision::fallback("No response");
  }

  if DIRECT_NEGATIVE_PHRASE.is_match(raw) {
    Decision::new(false, raw, DecisionBasis::Keyword)
  } else if DIRECT_YES.is_match(raw) {
    Decision::new(true, raw, DecisionBasis::Keyword)
  } else if DIRECT_NO.is_match(raw) {
    Decision::new(false, raw, DecisionBasis::Keyword)
  } else if DIRECT_RISK.is_match(raw) {
    Decision::new(true, raw, DecisionBasis::Keyword)
  } else {
    Decision::fallback(raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn decide(response: &str) -> Decision {
    extract_vulnerability_decision(Some(response))
  }

  #[test]
  fn test_vote_valid_vs_partial_is_not_vulnerable() {
    let decision = decide(r#"[{"decision": "valid"}, {"decision": "partially valid"}]"#);
    assert_eq!(decision.vulnerable, BinaryLabel::Negative);
    assert_eq!(decision.basis, DecisionBasis::Vote);
  }

  #[test]
  fn test_vote_strict_majority() {
    let decision = decide(r#"[{"decision": "valid"}, {"decision": "valid"}, {"decision": "invalid"}]"#);
    assert_eq!(decision.vulnerable, BinaryLabel::Positive);

    let tie = decide(r#"[{"decision": "accepted"}, {"decision": "rejected"}]"#);
    assert_eq!(tie.vulnerable, BinaryLabel::Negative);
  }

  #[test]
  fn test_classify_vote_precedence() {
    assert_eq!(classify_vote("Partially Valid"), Some(Vote::Partial));
    assert_eq!(classify_vote("invalid"), Some(Vote::Invalid));
    assert_eq!(classify_vote("not valid"), Some(Vote::Invalid));
    assert_eq!(classify_vote("No"), Some(Vote::Invalid));
    assert_eq!(classify_vote("resolved"), Some(Vote::Valid));
    assert_eq!(classify_vote("TRUE"), Some(Vote::Valid));
    assert_eq!(classify_vote("pending"), None);
  }

  #[test]
  fn test_board_reasoning_summary() {
    let decision = decide(
      r#"[{"vulnerability": "Buffer overflow", "decision": "valid", "severity": "high", "recommended_action": "bounds check"},
          {"vulnerability": "Null deref", "decision": "invalid"}]"#,
    );
    assert_eq!(
      decision.reasoning,
      "Buffer overflow: valid (severity: high, action: bounds check); Null deref: invalid (severity: N/A, action: N/A)"
    );
  }

  #[test]
  fn test_detected_object_and_array() {
    let decision = decide(r#"{"vulnerability_detected": true, "analysis": "unchecked memcpy"}"#);
    assert_eq!(decision.vulnerable, BinaryLabel::Positive);
    assert_eq!(decision.reasoning, "unchecked memcpy");
    assert_eq!(decision.basis, DecisionBasis::Detected);

    let decision = decide(
      "```json\n[{\"vulnerability_detected\": false, \"reasoning\": \"a\"}, {\"vulnerability_detected\": true, \"reasoning\": \"b\"}]\n```",
    );
    assert_eq!(decision.vulnerable, BinaryLabel::Positive);
    assert_eq!(decision.reasoning, "a; b");
  }

  #[test]
  fn test_single_board_object() {
    let decision = decide(r#"{"vulnerability": "UAF", "decision": "valid"}"#);
    assert_eq!(decision.vulnerable, BinaryLabel::Positive);
    assert_eq!(decision.basis, DecisionBasis::Vote);
  }

  #[test]
  fn test_malformed_json_is_conservative() {
    let decision = decide(r#"[{"decision": "valid"}, "#);
    assert_eq!(decision.vulnerable, BinaryLabel::Negative);
    assert!(decision.reasoning.starts_with("Error parsing JSON decision:"));
    assert!(decision.is_fallback());
  }

  #[test]
  fn test_free_text_keywords() {
    assert_eq!(
      decide("The function is vulnerable to a heap overflow.").vulnerable,
      BinaryLabel::Positive
    );
    assert_eq!(decide("Potential security issue in parsing").basis, DecisionBasis::Keyword);
    assert_eq!(decide("Looks fine to me").vulnerable, BinaryLabel::Negative);
    assert!(extract_vulnerability_decision(None).is_fallback());
  }

  #[test]
  fn test_free_text_substring_counts_negated_mentions() {
    let decision = decide("The code is not vulnerable.");
    assert_eq!(decision.vulnerable, BinaryLabel::Positive);
    assert_eq!(decision.basis, DecisionBasis::Keyword);
    assert_eq!(decide("No security issues found").vulnerable, BinaryLabel::Positive);
  }

  #[test]
  fn test_free_text_negation_aware() {
    let strict = |text| extract_vulnerability_decision_with(Some(text), KeywordMatch::NegationAware);
    assert!(strict("The code is not vulnerable.").is_fallback());
    assert!(strict("No security issues found").is_fallback());
    assert_eq!(strict("non-vulnerable wrapper").vulnerable, BinaryLabel::Negative);
    assert_eq!(
      strict("Not vulnerable to overflow, but the cast is unsafe").vulnerable,
      BinaryLabel::Positive
    );

    // JSON answers are unaffected by the keyword policy
    let board = r#"[{"decision": "valid"}, {"decision": "valid"}]"#;
    assert_eq!(strict(board), decide(board));
  }

  #[test]
  fn test_direct_answers() {
    assert_eq!(parse_direct_answer(Some("(1) YES")).vulnerable, BinaryLabel::Positive);
    assert_eq!(parse_direct_answer(Some("No.")).vulnerable, BinaryLabel::Negative);
    assert_eq!(
      parse_direct_answer(Some("No vulnerability detected in this function")).vulnerable,
      BinaryLabel::Negative
    );
    assert_eq!(
      parse_direct_answer(Some("Possible integer overflow when len is large")).vulnerable,
      BinaryLabel::Positive
    );
    assert!(parse_direct_answer(Some("I cannot tell")).is_fallback());
  }
}
