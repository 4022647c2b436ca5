//! Response normalization.
//!
//! Every function here is total: any input, including an absent response,
//! maps to a value of the task's output type. Fallbacks are tagged with
//! [`Basis::Fallback`] so runs can report how many labels were guessed.

pub mod code;
pub mod labels;
pub mod template;
pub mod text;
pub mod transcript;

pub use code::{CodeSource, ExtractedCode, extract_code};
pub use labels::{classify_log_analysis, classify_td_label, normalize_log_analysis_result, normalize_td_label};
pub use template::{Rule, TemplateNormalizer, normalize_template};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How a label was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
  /// `APPROVED|d|` / `REJECTED|d|` marker
  CriticVerdict,
  /// A label digit in the text
  Digit,
  /// Keyword inference
  Keyword,
  /// Nothing recognisable, default label used
  Fallback,
}

/// A normalized label together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalized<L> {
  pub label: L,
  pub basis: Basis,
}

impl<L> Normalized<L> {
  pub fn new(label: L, basis: Basis) -> Self {
    Self { label, basis }
  }

  pub fn fallback(label: L) -> Self {
    Self::new(label, Basis::Fallback)
  }

  pub fn is_fallback(&self) -> bool {
    self.basis == Basis::Fallback
  }
}

/// Apply `f` to every item in parallel. Output order equals input order.
pub fn normalize_all<I, T, F>(items: &[I], f: F) -> Vec<T>
where
  I: Sync,
  T: Send,
  F: Fn(&I) -> T + Sync + Send,
{
  items.par_iter().map(f).collect()
}

/// Count fallbacks in a batch of normalized labels.
pub fn count_fallbacks<L>(labels: &[Normalized<L>]) -> usize {
  labels.iter().filter(|l| l.is_fallback()).count()
}
