//! Text cleanup shared by the normalizers.

use std::sync::LazyLock;

use regex::Regex;

/// A fence plus an optional letter-led language tag. Digits are never part of the tag.
static FENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"```(?:[A-Za-z][A-Za-z+_-]*)?").expect("Invalid fence regex"));

static BOILERPLATE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)You are a helpful assistant\.?").expect("Invalid boilerplate regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Remove triple-backtick fences together with any language tag.
pub fn strip_fences(text: &str) -> String {
  FENCE.replace_all(text, "").into_owned()
}

/// Remove the system-prompt echo some models prepend.
pub fn strip_boilerplate(text: &str) -> String {
  BOILERPLATE.replace_all(text, "").into_owned()
}

/// Join non-blank lines with single spaces and collapse whitespace runs.
pub fn clean_text(text: &str) -> String {
  let joined = text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
  WHITESPACE.replace_all(&joined, " ").trim().to_string()
}

/// Body of a fenced block when the whole text is one (```json ... ```), else the trimmed text.
pub fn unwrap_code_block(text: &str) -> &str {
  let text = text.trim();
  if !text.starts_with("```") {
    return text;
  }

  let Some(first_newline) = text.find('\n') else {
    return text.trim_matches('`').trim();
  };
  let after_fence = &text[first_newline + 1..];
  match after_fence.rfind("```") {
    Some(end) => after_fence[..end].trim(),
    None => after_fence.trim(),
  }
}
