//! Closed label alphabets for the classification tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Technical Debt Labels
// ============================================================================

/// Code smell category for technical-debt detection.
///
/// Serialized as the digit the prompts ask the model for (`"0"`..`"4"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SmellLabel {
  #[default]
  #[serde(rename = "0")]
  NoSmell,
  #[serde(rename = "1")]
  Blob,
  #[serde(rename = "2")]
  DataClass,
  #[serde(rename = "3")]
  FeatureEnvy,
  #[serde(rename = "4")]
  LongMethod,
}

impl SmellLabel {
  pub const ALL: [SmellLabel; 5] = [
    SmellLabel::NoSmell,
    SmellLabel::Blob,
    SmellLabel::DataClass,
    SmellLabel::FeatureEnvy,
    SmellLabel::LongMethod,
  ];

  /// Parse a single label digit. Digits outside `0-4` are not labels.
  pub fn from_digit(c: char) -> Option<Self> {
    match c {
      '0' => Some(SmellLabel::NoSmell),
      '1' => Some(SmellLabel::Blob),
      '2' => Some(SmellLabel::DataClass),
      '3' => Some(SmellLabel::FeatureEnvy),
      '4' => Some(SmellLabel::LongMethod),
      _ => None,
    }
  }

  /// Look up a label by its dataset name ("Feature Envy", "blob", ...).
  pub fn from_name(name: &str) -> Option<Self> {
    let name = name.trim();
    Self::ALL.into_iter().find(|l| l.name().eq_ignore_ascii_case(name))
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      SmellLabel::NoSmell => "0",
      SmellLabel::Blob => "1",
      SmellLabel::DataClass => "2",
      SmellLabel::FeatureEnvy => "3",
      SmellLabel::LongMethod => "4",
    }
  }

  /// Human-readable category name as used in the MLCQ dataset.
  pub fn name(&self) -> &'static str {
    match self {
      SmellLabel::NoSmell => "No smell",
      SmellLabel::Blob => "Blob",
      SmellLabel::DataClass => "Data Class",
      SmellLabel::FeatureEnvy => "Feature Envy",
      SmellLabel::LongMethod => "Long Method",
    }
  }

  /// Whether this label reports a smell (the positive class of the binary view).
  pub fn is_smell(&self) -> bool {
    *self != SmellLabel::NoSmell
  }
}

impl fmt::Display for SmellLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ============================================================================
// Binary Labels
// ============================================================================

/// Binary verdict used by log anomaly analysis and vulnerability detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum BinaryLabel {
  /// Normal session / non-vulnerable code
  #[default]
  #[serde(rename = "0")]
  Negative,
  /// Anomalous session / vulnerable code
  #[serde(rename = "1")]
  Positive,
}

impl BinaryLabel {
  pub fn from_digit(c: char) -> Option<Self> {
    match c {
      '0' => Some(BinaryLabel::Negative),
      '1' => Some(BinaryLabel::Positive),
      _ => None,
    }
  }

  pub fn from_bool(positive: bool) -> Self {
    if positive {
      BinaryLabel::Positive
    } else {
      BinaryLabel::Negative
    }
  }

  pub fn is_positive(&self) -> bool {
    *self == BinaryLabel::Positive
  }

  pub fn as_u8(&self) -> u8 {
    match self {
      BinaryLabel::Negative => 0,
      BinaryLabel::Positive => 1,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      BinaryLabel::Negative => "0",
      BinaryLabel::Positive => "1",
    }
  }
}

impl fmt::Display for BinaryLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
