//! Recovering the final template from multi-role transcripts.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker that a message contains a template rather than discussion.
static TEMPLATE_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<\*>|<[^>\n]*>").expect("Invalid template marker regex"));

/// Replies that acknowledge feedback instead of restating the template.
static ACKNOWLEDGEMENT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)understood|no further feedback|thank|feel free|additional feedback")
    .expect("Invalid acknowledgement regex")
});

static EDGE_FENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^```|```$").expect("Invalid edge fence regex"));

/// Returned when no parser response carries a template.
pub const NO_TEMPLATE: &str = "NONE";

/// One chat message in an agent conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub name: String,
  pub content: String,
}

/// Last message from `agent` that looks like a template.
pub fn last_template_from_history<'a>(history: &'a [Message], agent: &str) -> Option<&'a str> {
  history
    .iter()
    .rev()
    .filter(|m| m.name == agent)
    .map(|m| m.content.trim())
    .find(|content| TEMPLATE_MARKER.is_match(content))
}

/// Last non-empty message from `agent`, template or not.
pub fn last_message_from_history<'a>(history: &'a [Message], agent: &str) -> Option<&'a str> {
  history
    .iter()
    .rev()
    .filter(|m| m.name == agent)
    .map(|m| m.content.trim())
    .find(|content| !content.is_empty())
}

/// Last parser response containing `<*>` that is not a mere acknowledgement,
/// with edge fences removed. [`NO_TEMPLATE`] when there is none.
pub fn template_from_parser_responses(responses: &[String]) -> String {
  responses
    .iter()
    .rev()
    .map(|r| r.trim())
    .find(|content| content.contains("<*>") && !ACKNOWLEDGEMENT.is_match(content))
    .map(|content| EDGE_FENCE.replace_all(content, "").into_owned())
    .unwrap_or_else(|| NO_TEMPLATE.to_string())
}
