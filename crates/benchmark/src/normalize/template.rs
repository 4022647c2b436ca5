//! Log template normalization.
//!
//! A [`TemplateNormalizer`] is an ordered list of [`Rule`]s applied to the raw
//! model output. Each rule either rewrites the text and hands it to the next
//! rule, or (for [`RuleKind::Capture`]) declares its capture the answer and ends
//! the pass. Whatever comes out is joined onto a single line.
//!
//! Presets reproduce the rule sets the experiments were run with:
//!
//! | Preset           | Behaviour                                                       |
//! |------------------|-----------------------------------------------------------------|
//! | `legacy`         | control tokens, fences and two stop phrases                     |
//! | `standard`       | full cleanup, explanation truncation, quoted-answer extraction  |
//! | `extractive`     | explicit "The template should be ..." answers, then standard    |
//! | `conversational` | drops apologies, picks quoted templates, then standard          |

use std::sync::LazyLock;

use agentgreen_core::{NormalizerConfig, RuleKind, TemplatePreset};
use regex::Regex;
use tracing::trace;

use super::text::clean_text;
use crate::{BenchmarkError, Result};

// ============================================================================
// Rule tables
// ============================================================================

/// Applied first by every preset.
const PREAMBLE: &[(RuleKind, &str)] = &[
  (RuleKind::Strip, r"<\|.*?\|>"),
  (RuleKind::Strip, r"(?i)You are a helpful assistant\.?"),
  (RuleKind::Strip, r"```"),
];

const LEGACY: &[(RuleKind, &str)] = &[(
  RuleKind::Stop,
  r"The template you provided is correct|Therefore, no further suggestions",
)];

/// Cleanup shared by `standard`, `extractive` and `conversational`.
const STANDARD: &[(RuleKind, &str)] = &[
  // A template that starts the reply and runs up to a "Human" turn or the end.
  (RuleKind::Focus, r"(?is)\A([^hH]*?<\*>.*?<\*>[^hH]*?)(?:human|\n?\z)"),
  (RuleKind::Strip, r"(?is)Human Compare and refine.*"),
  // Headers and lead-ins in front of the template.
  (RuleKind::Strip, r"(?i)\*{0,2}Final Refined Template:\*{0,2}[ \t]*"),
  (RuleKind::Strip, r"(?i)Both templates are correct[^\n]*\n?"),
  (RuleKind::Strip, r"(?i)Merged and corrected[^\n]*\n?"),
  (
    RuleKind::Strip,
    r"(?i)\A\s*The template is (?:incorrect|correct)\. (?:The )?correct template should be:\s*",
  ),
  (
    RuleKind::Strip,
    r"(?i)\A\s*The template corresponding to the log message (?:is|would be):\s*",
  ),
  (
    RuleKind::Strip,
    r"(?i)\A\s*(?:the\s+)?(?:final\s+|refined\s+|corrected\s+)?template(?:\s+(?:is|would be|should be))?\s*:\s*",
  ),
  // Trailing commentary and stray artefacts.
  (RuleKind::Strip, r"(?is)\s*Here, <\*> represents.*\z"),
  (RuleKind::Strip, r#"(?is)"\s*This means.*\z"#),
  (RuleKind::Strip, r"(?is)\A\s*python\s+import\s+.*"),
  (RuleKind::Strip, r"(?i)I am an AI model[^\n]*"),
  (RuleKind::Strip, r"(?is)\*\*Created (?:Question|Answer)\*\*:.*"),
  // 'template'. This ...
  (RuleKind::Capture, r#"(?is)\A\s*['"`](.+?)['"`]\.\s+This\b"#),
  (
    RuleKind::Stop,
    r"(?i)\s+(?:Here,|(?:This means|This can be interpreted|In this case|The angle brackets)\b)",
  ),
  (RuleKind::Focus, r#"(?s)\A\s*['"](.*?)['"]\s*\z"#),
  (RuleKind::Strip, r"[.,;:\s]+\z"),
  (RuleKind::Strip, r"(?is)Both templates are correct.*"),
  (RuleKind::Strip, r"(?is)You are a language model.*"),
  (RuleKind::Strip, r"(?is)You are Qwen, created by Alibaba Cloud.*"),
  (RuleKind::Strip, r"(?i)The template you provided is correct"),
  (RuleKind::Strip, r"(?i)Therefore, no further suggestions"),
  (
    RuleKind::Strip,
    r"(?i)\(?Merged and corrected (?:to abstract both dynamic parameters|both templates into a more accurate version)\)?",
  ),
  (
    RuleKind::Stop,
    r"(?i)\bNote:|This template|Thus,|Therefore,|The template reflects",
  ),
];

/// Phrasings that state the answer outright.
const EXPLICIT_ANSWERS: &[(RuleKind, &str)] = &[
  (
    RuleKind::Capture,
    r"(?is)Here is an example of a log message and its corresponding template:.*?Template:\s*([^\n]+)",
  ),
  (RuleKind::Capture, r"(?is)The template remains as it is:\s*([^\n]+)"),
  (
    RuleKind::Capture,
    r"(?is)([^\n]+)\s+This is the template corresponding to the log message",
  ),
  (RuleKind::Capture, r#"(?is)The template should be ["']([^"']+)["']"#),
  (RuleKind::Capture, r"(?is)The template should be\s+([^\n.]+?)(?:\.|\n?\z)"),
  (RuleKind::Capture, r"(?is)should indeed be as follows:\s*([^\n]+)"),
];

/// Templates written as code.
const CODE_ANSWERS: &[(RuleKind, &str)] = &[
  (RuleKind::Capture, r#"(?is)print\((?:template\s*=\s*)?['"]([^'"]+)['"]\)"#),
  (RuleKind::Capture, r#"(?is)template\s*=\s*['"]([^'"]+)['"]"#),
];

/// Like the standard leading focus, but any `<...>` counts as a placeholder.
const LOOSE_FOCUS: &[(RuleKind, &str)] = &[(
  RuleKind::Focus,
  r"(?is)\A([^hH]*?<(?:\*|[^>]*)>.*?<(?:\*|[^>]*)>[^hH]*?)(?:human|\n?\z)",
)];

const APOLOGY: &[(RuleKind, &str)] = &[(
  RuleKind::Strip,
  r"(?i)\A(?:I apologize|Yes, (?:that's|you are|you're) correct|You're right|Indeed,)\S*",
)];

/// Templates quoted inline somewhere in the reply.
const QUOTED_ANSWERS: &[(RuleKind, &str)] = &[
  (RuleKind::Capture, r"`([^`]*<[^`>]*>[^`]*)`"),
  (RuleKind::Capture, r#""([^"]*<[^>]+>[^"]*)""#),
  (RuleKind::Capture, r"'([^']*<[^>]+>[^']*)'"),
];

fn preset_tables(preset: TemplatePreset) -> Vec<&'static [(RuleKind, &'static str)]> {
  match preset {
    TemplatePreset::Legacy => vec![PREAMBLE, LEGACY],
    TemplatePreset::Standard => vec![PREAMBLE, STANDARD],
    TemplatePreset::Extractive => vec![PREAMBLE, EXPLICIT_ANSWERS, CODE_ANSWERS, LOOSE_FOCUS, STANDARD],
    TemplatePreset::Conversational => vec![PREAMBLE, APOLOGY, EXPLICIT_ANSWERS, QUOTED_ANSWERS, STANDARD],
  }
}

// ============================================================================
// Rules
// ============================================================================

/// A compiled normalization rule.
#[derive(Debug, Clone)]
pub struct Rule {
  kind: RuleKind,
  regex: Regex,
}

enum Step {
  Continue(String),
  Done(String),
}

impl Rule {
  pub fn new(kind: RuleKind, pattern: &str) -> Result<Self> {
    let regex = Regex::new(pattern).map_err(|source| BenchmarkError::InvalidRule {
      pattern: pattern.to_string(),
      source,
    })?;
    Ok(Self { kind, regex })
  }

  pub fn kind(&self) -> RuleKind {
    self.kind
  }

  pub fn pattern(&self) -> &str {
    self.regex.as_str()
  }

  fn apply(&self, mut text: String) -> Step {
    match self.kind {
      RuleKind::Strip => Step::Continue(self.regex.replace_all(&text, "").into_owned()),
      RuleKind::Stop => {
        if let Some(cut) = self.regex.find(&text).map(|m| m.start()) {
          text.truncate(cut);
        }
        Step::Continue(text)
      }
      RuleKind::Capture => match self.first_group(&text) {
        Some(answer) => Step::Done(answer.trim().to_string()),
        None => Step::Continue(text),
      },
      RuleKind::Focus => match self.first_group(&text) {
        Some(kept) => Step::Continue(kept.to_string()),
        None => Step::Continue(text),
      },
    }
  }

  /// Capture group 1, or the whole match for patterns without groups.
  fn first_group<'t>(&self, text: &'t str) -> Option<&'t str> {
    let caps = self.regex.captures(text)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
  }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Rule-driven template normalizer.
#[derive(Debug, Clone)]
pub struct TemplateNormalizer {
  rules: Vec<Rule>,
}

static STANDARD_NORMALIZER: LazyLock<TemplateNormalizer> =
  LazyLock::new(|| TemplateNormalizer::preset(TemplatePreset::Standard));

impl TemplateNormalizer {
  pub fn new(rules: Vec<Rule>) -> Self {
    Self { rules }
  }

  /// Built-in rule set for a preset.
  pub fn preset(preset: TemplatePreset) -> Self {
    let rules = preset_tables(preset)
      .into_iter()
      .flatten()
      .map(|&(kind, pattern)| Rule::new(kind, pattern).expect("Invalid built-in template rule"))
      .collect();
    Self { rules }
  }

  /// Configured rules followed by the configured preset.
  pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
    let mut rules = config
      .rules
      .iter()
      .map(|r| Rule::new(r.kind, &r.pattern))
      .collect::<Result<Vec<_>>>()?;
    rules.extend(Self::preset(config.preset).rules);
    Ok(Self { rules })
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  /// Reduce a raw response to a single-line template.
  ///
  /// Never fails: when no rule finds a template the cleaned input is returned.
  pub fn normalize(&self, text: &str) -> String {
    let mut current = text.to_string();
    for (idx, rule) in self.rules.iter().enumerate() {
      match rule.apply(current) {
        Step::Continue(next) => current = next,
        Step::Done(answer) => {
          trace!(rule = idx, pattern = rule.pattern(), "Template captured");
          return clean_text(&answer);
        }
      }
    }
    clean_text(&current)
  }
}

impl Default for TemplateNormalizer {
  fn default() -> Self {
    STANDARD_NORMALIZER.clone()
  }
}

/// Normalize with the standard preset.
pub fn normalize_template(text: &str) -> String {
  STANDARD_NORMALIZER.normalize(text)
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentgreen_core::RuleConfig;
  use pretty_assertions::assert_eq;

  const BLOCK_TEMPLATE: &str = "BLOCK* NameSystem.addStoredBlock: blockMap updated: <*>:<*> is added to <*> size <*>";

  #[test]
  fn test_all_presets_compile() {
    for preset in [
      TemplatePreset::Legacy,
      TemplatePreset::Standard,
      TemplatePreset::Extractive,
      TemplatePreset::Conversational,
    ] {
      let normalizer = TemplateNormalizer::preset(preset);
      assert_eq!(normalizer.rules()[0].kind(), RuleKind::Strip);
      assert_eq!(normalizer.rules()[0].pattern(), r"<\|.*?\|>");
    }
  }

  #[test]
  fn test_lead_in_and_explanation_removed() {
    let raw = format!("The template is: {BLOCK_TEMPLATE}. This means the IP/port pairs and IDs are abstracted.");
    assert_eq!(normalize_template(&raw), BLOCK_TEMPLATE);
  }

  #[test]
  fn test_control_tokens_and_fences() {
    let raw = "<|assistant|>\n```\nReceiving block <*> src: /<*>:<*> dest: /<*>:<*>\n```<|endoftext|>";
    assert_eq!(
      normalize_template(raw),
      "Receiving block <*> src: /<*>:<*> dest: /<*>:<*>"
    );
  }

  #[test]
  fn test_quoted_literal_followed_by_explanation() {
    let raw = "\"PacketResponder <*> for block <*> terminating\". This abstracts the responder id.";
    assert_eq!(normalize_template(raw), "PacketResponder <*> for block <*> terminating");
  }

  #[test]
  fn test_human_turn_is_dropped() {
    let raw = "Deleting block <*> file <*>\nHuman Compare and refine the template again";
    assert_eq!(normalize_template(raw), "Deleting block <*> file <*>");
  }

  #[test]
  fn test_note_and_therefore_truncate() {
    assert_eq!(
      normalize_template("Verification succeeded for <*> Note: the block id varies"),
      "Verification succeeded for <*>"
    );
    assert_eq!(
      normalize_template("Served block <*> to /<*> Therefore, the IP is a variable."),
      "Served block <*> to /<*>"
    );
  }

  #[test]
  fn test_unreducible_input_is_cleaned_not_dropped() {
    assert_eq!(normalize_template("  I could not\n\n find   anything  "), "I could not find anything");
    assert_eq!(normalize_template(""), "");
  }

  #[test]
  fn test_clean_template_is_stable() {
    for template in [
      BLOCK_TEMPLATE,
      "Receiving block <*> src: /<*>:<*> dest: /<*>:<*>",
      "PacketResponder <*> for block <*> terminating",
      "<*> Starting thread to transfer block <*> to <*>",
      "Verification succeeded for <*>",
    ] {
      let once = normalize_template(template);
      assert_eq!(once, template);
      assert_eq!(normalize_template(&once), once);
    }
  }

  #[test]
  fn test_legacy_preset() {
    let normalizer = TemplateNormalizer::preset(TemplatePreset::Legacy);
    let raw = "Served block <*> to /<*>\nThe template you provided is correct. Nothing else.";
    assert_eq!(normalizer.normalize(raw), "Served block <*> to /<*>");
  }

  #[test]
  fn test_extractive_preset_finds_explicit_answer() {
    let normalizer = TemplateNormalizer::preset(TemplatePreset::Extractive);
    assert_eq!(
      normalizer.normalize("After review, the template should be 'Deleting block <*> file <*>' as shown."),
      "Deleting block <*> file <*>"
    );
    assert_eq!(
      normalizer.normalize("```python\ntemplate = \"Served block <*> to /<*>\"\nprint(template)\n```"),
      "Served block <*> to /<*>"
    );
  }

  #[test]
  fn test_conversational_preset_drops_apology() {
    let normalizer = TemplateNormalizer::preset(TemplatePreset::Conversational);
    assert_eq!(
      normalizer.normalize("You're right, the correct one is `Received block <*> of size <*> from /<*>`"),
      "Received block <*> of size <*> from /<*>"
    );
  }

  #[test]
  fn test_custom_rules_run_first() {
    let config = NormalizerConfig {
      preset: TemplatePreset::Standard,
      rules: vec![RuleConfig {
        kind: RuleKind::Strip,
        pattern: r"(?i)\AAnswer:\s*".to_string(),
      }],
    };
    let normalizer = TemplateNormalizer::from_config(&config).unwrap();
    assert_eq!(normalizer.normalize("Answer: Served block <*> to /<*>"), "Served block <*> to /<*>");
  }

  #[test]
  fn test_invalid_custom_rule() {
    let config = NormalizerConfig {
      preset: TemplatePreset::Standard,
      rules: vec![RuleConfig {
        kind: RuleKind::Stop,
        pattern: "(unclosed".to_string(),
      }],
    };
    assert!(matches!(
      TemplateNormalizer::from_config(&config),
      Err(BenchmarkError::InvalidRule { .. })
    ));
  }
}
