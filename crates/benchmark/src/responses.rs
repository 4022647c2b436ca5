//! Raw model outputs as produced by the agent pipelines.
//!
//! Three layouts are accepted:
//! - plain text, one response per line
//! - `key<TAB>response` lines (log analysis writes `block_id\tlabel`), read
//!   only through [`load_keyed_responses`]
//! - JSONL records with a `response` field, or a `history` / `parser_responses`
//!   transcript from which the final template is recovered
//!
//! Every input line yields exactly one [`RawResponse`]; anything unusable becomes
//! a placeholder so positions never shift.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::Result;
use crate::normalize::transcript::{
  Message, last_message_from_history, last_template_from_history, template_from_parser_responses,
};

/// Agent whose messages carry the template in multi-role transcripts.
pub const DEFAULT_PARSER_AGENT: &str = "log_parser_agent";

/// One model output, keyed when the source provides a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
  pub key: Option<String>,
  pub text: Option<String>,
}

impl RawResponse {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      key: None,
      text: Some(text.into()),
    }
  }

  pub fn keyed(key: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      key: Some(key.into()),
      text: Some(text.into()),
    }
  }

  pub fn placeholder() -> Self {
    Self::default()
  }

  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  pub fn is_placeholder(&self) -> bool {
    self.text.as_deref().is_none_or(|t| t.trim().is_empty())
  }
}

/// How a responses file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
  Lines,
  Keyed,
  JsonLines,
}

impl ResponseFormat {
  /// `.jsonl`/`.json` files are JSON lines, anything else is `text_format`.
  /// Content is never sniffed: a tab inside a plain response stays text.
  pub fn detect(path: &Path, text_format: ResponseFormat) -> Self {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("json") {
      ResponseFormat::JsonLines
    } else {
      text_format
    }
  }
}

#[derive(Debug, Deserialize)]
struct ResponseRecord {
  #[serde(default, alias = "raw_output", alias = "output")]
  response: Option<String>,
  #[serde(default, alias = "block_id", alias = "task_id")]
  id: Option<serde_json::Value>,
  #[serde(default)]
  history: Vec<Message>,
  #[serde(default)]
  agent: Option<String>,
  #[serde(default)]
  parser_responses: Vec<String>,
}

impl ResponseRecord {
  fn into_response(self) -> RawResponse {
    let key = self.id.map(|v| match v {
      serde_json::Value::String(s) => s,
      other => other.to_string(),
    });

    let text = if self.response.is_some() {
      self.response
    } else if !self.history.is_empty() {
      let agent = self.agent.as_deref().unwrap_or(DEFAULT_PARSER_AGENT);
      last_template_from_history(&self.history, agent)
        .or_else(|| last_message_from_history(&self.history, agent))
        .map(str::to_string)
    } else if !self.parser_responses.is_empty() {
      Some(template_from_parser_responses(&self.parser_responses))
    } else {
      None
    };

    RawResponse { key, text }
  }
}

/// Parse responses from already-loaded content.
pub fn parse_responses(content: &str, format: ResponseFormat) -> Vec<RawResponse> {
  let lines = content.lines();
  match format {
    ResponseFormat::Lines => lines
      .map(|line| {
        if line.trim().is_empty() {
          RawResponse::placeholder()
        } else {
          RawResponse::new(line.trim())
        }
      })
      .collect(),
    ResponseFormat::Keyed => lines
      .filter(|line| !line.trim().is_empty())
      .map(|line| match line.split_once('\t') {
        Some((key, text)) => RawResponse::keyed(key.trim(), text.trim()),
        None => {
          debug!(line, "Keyed line without a tab, treating as key with no response");
          RawResponse {
            key: Some(line.trim().to_string()),
            text: None,
          }
        }
      })
      .collect(),
    ResponseFormat::JsonLines => lines
      .enumerate()
      .filter(|(_, line)| !line.trim().is_empty())
      .map(|(line_no, line)| match serde_json::from_str::<ResponseRecord>(line) {
        Ok(record) => record.into_response(),
        Err(e) => {
          warn!(line = line_no + 1, err = %e, "Unparseable response record, using placeholder");
          RawResponse::placeholder()
        }
      })
      .collect(),
  }
}

/// Load a responses file: JSON lines by extension, else one response per line.
pub fn load_responses(path: &Path) -> Result<Vec<RawResponse>> {
  load_with_format(path, ResponseFormat::detect(path, ResponseFormat::Lines))
}

/// Load a responses file whose text lines are `key<TAB>response`.
pub fn load_keyed_responses(path: &Path) -> Result<Vec<RawResponse>> {
  load_with_format(path, ResponseFormat::detect(path, ResponseFormat::Keyed))
}

fn load_with_format(path: &Path, format: ResponseFormat) -> Result<Vec<RawResponse>> {
  let content = std::fs::read_to_string(path)?;
  let responses = parse_responses(&content, format);

  let placeholders = responses.iter().filter(|r| r.is_placeholder()).count();
  info!(
    count = responses.len(),
    placeholders,
    format = ?format,
    path = %path.display(),
    "Loaded raw responses"
  );
  Ok(responses)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use tempfile::TempDir;

  #[test]
  fn test_plain_lines_keep_blank_positions() {
    let responses = parse_responses("first <*>\n\n  third  \n", ResponseFormat::Lines);
    assert_eq!(responses.len(), 3);
    assert!(responses[1].is_placeholder());
    assert_eq!(responses[2].text(), Some("third"));
  }

  #[test]
  fn test_keyed_lines() {
    let responses = parse_responses("blk_1\t1\nblk_2\tThe session is normal\nblk_3\n", ResponseFormat::Keyed);
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[1], RawResponse::keyed("blk_2", "The session is normal"));
    assert_eq!(responses[2].key.as_deref(), Some("blk_3"));
    assert!(responses[2].is_placeholder());
  }

  #[test]
  fn test_json_lines_variants() {
    let content = r#"{"block_id": "blk_9", "response": "0"}
{"response": null}
{"idx": 3}
broken
{"history": [{"name": "log_parser_agent", "content": "Receiving block <*>"}, {"name": "critic", "content": "Looks good"}]}
{"parser_responses": ["Template: <*> served", "Thank you, no further feedback"]}
"#;
    let responses = parse_responses(content, ResponseFormat::JsonLines);
    assert_eq!(responses.len(), 6);
    assert_eq!(responses[0], RawResponse::keyed("blk_9", "0"));
    assert!(responses[1].is_placeholder());
    assert!(responses[2].is_placeholder());
    assert!(responses[3].is_placeholder());
    assert_eq!(responses[4].text(), Some("Receiving block <*>"));
    assert_eq!(responses[5].text(), Some("Template: <*> served"));
  }

  #[test]
  fn test_detect_format() {
    let detect = ResponseFormat::detect;
    assert_eq!(detect(Path::new("out.jsonl"), ResponseFormat::Keyed), ResponseFormat::JsonLines);
    assert_eq!(detect(Path::new("out.JSON"), ResponseFormat::Lines), ResponseFormat::JsonLines);
    assert_eq!(detect(Path::new("out.txt"), ResponseFormat::Keyed), ResponseFormat::Keyed);
    assert_eq!(detect(Path::new("out"), ResponseFormat::Lines), ResponseFormat::Lines);
  }

  #[test]
  fn test_tabbed_template_stays_plain() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("raw.txt");
    std::fs::write(&path, "Served block <*>\tto /<*>\nDeleting block <*>\n").unwrap();

    let responses = load_responses(&path).unwrap();
    assert_eq!(
      responses,
      vec![
        RawResponse::new("Served block <*>\tto /<*>"),
        RawResponse::new("Deleting block <*>"),
      ]
    );

    let keyed = load_keyed_responses(&path).unwrap();
    assert_eq!(keyed[0], RawResponse::keyed("Served block <*>", "to /<*>"));
    assert!(keyed[1].is_placeholder());
  }

  #[test]
  fn test_keyed_loader_reads_json_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("raw.jsonl");
    std::fs::write(&path, "{\"block_id\": \"blk_4\", \"response\": \"1\"}\n").unwrap();

    assert_eq!(load_keyed_responses(&path).unwrap(), vec![RawResponse::keyed("blk_4", "1")]);
  }
}
