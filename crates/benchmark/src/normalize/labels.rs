//! Classification label extraction.
//!
//! Both extractors run strip -> extract -> fallback in that order, so a digit in
//! the reply always wins over keyword inference.

use std::sync::LazyLock;

use agentgreen_core::{BinaryLabel, SmellLabel};
use regex::Regex;

use super::text::{strip_boilerplate, strip_fences};
use super::{Basis, Normalized};

/// Critic/refiner convention `APPROVED|<d>|` or `REJECTED|<d>|<reason>`.
static CRITIC_VERDICT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)(?:APPROVED|REJECTED)\|(\d)\|?").expect("Invalid critic verdict regex"));

static NON_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D").expect("Invalid non-digit regex"));

static BINARY_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[01]\b").expect("Invalid binary digit regex"));

static ANOMALY_WORD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)anomal|abnormal").expect("Invalid anomaly keyword regex"));

static NORMAL_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)normal").expect("Invalid normal keyword regex"));

// ============================================================================
// Technical debt
// ============================================================================

/// Extract a smell label, recording how it was found.
pub fn classify_td_label(text: Option<&str>) -> Normalized<SmellLabel> {
  let Some(text) = text else {
    return Normalized::fallback(SmellLabel::NoSmell);
  };
  let text = strip_boilerplate(&strip_fences(text.trim()));

  // Everything after a critic marker is reasoning, never a label.
  let mut search = text.as_str();
  if let Some(caps) = CRITIC_VERDICT.captures(&text)
    && let (Some(marker), Some(digit)) = (caps.get(0), caps.get(1))
  {
    if let Some(label) = digit.as_str().chars().next().and_then(SmellLabel::from_digit) {
      return Normalized::new(label, Basis::CriticVerdict);
    }
    search = &text[..marker.start()];
  }

  match search.chars().find_map(SmellLabel::from_digit) {
    Some(label) => Normalized::new(label, Basis::Digit),
    None => Normalized::fallback(SmellLabel::NoSmell),
  }
}

/// Map a raw response to one of the five smell labels. Defaults to no smell.
pub fn normalize_td_label(text: Option<&str>) -> SmellLabel {
  classify_td_label(text).label
}

// ============================================================================
// Log anomaly analysis
// ============================================================================

/// Extract an anomaly label, recording how it was found.
pub fn classify_log_analysis(text: Option<&str>) -> Normalized<BinaryLabel> {
  let Some(text) = text else {
    return Normalized::fallback(BinaryLabel::Negative);
  };
  let text = strip_fences(text.trim());

  let digits_only = NON_DIGIT.replace_all(&text, " ");
  if let Some(label) = BINARY_DIGIT
    .find(&digits_only)
    .and_then(|m| m.as_str().chars().next())
    .and_then(BinaryLabel::from_digit)
  {
    return Normalized::new(label, Basis::Digit);
  }

  if ANOMALY_WORD.is_match(&text) {
    Normalized::new(BinaryLabel::Positive, Basis::Keyword)
  } else if NORMAL_WORD.is_match(&text) {
    Normalized::new(BinaryLabel::Negative, Basis::Keyword)
  } else {
    Normalized::fallback(BinaryLabel::Negative)
  }
}

/// Map a raw response to `0` (normal) or `1` (anomalous). Defaults to normal.
pub fn normalize_log_analysis_result(text: Option<&str>) -> BinaryLabel {
  classify_log_analysis(text).label
}
