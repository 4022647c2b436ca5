//! Python code extraction for the code generation benchmark.

use serde::{Deserialize, Serialize};

/// Where the extracted code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
  /// A ```python fenced block
  PythonFence,
  /// Any other fenced block
  Fence,
  /// Lines from the first `def`/`import`/`from` until prose resumes
  Definition,
  /// Nothing recognisable, the whole reply is used
  Raw,
  /// Empty or absent reply
  Empty,
}

impl CodeSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      CodeSource::PythonFence => "python_fence",
      CodeSource::Fence => "fence",
      CodeSource::Definition => "definition",
      CodeSource::Raw => "raw",
      CodeSource::Empty => "empty",
    }
  }
}

impl std::fmt::Display for CodeSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
  pub code: String,
  pub source: CodeSource,
}

/// Line openings that mark prose rather than code.
const PROSE_PREFIXES: [&str; 6] = ["To solve", "The ", "This ", "Here", "Note:", "**"];

const CODE_PREFIXES: [&str; 3] = ["def ", "from ", "import "];

/// Pull the completion out of a model reply.
pub fn extract_code(response: Option<&str>) -> ExtractedCode {
  let text = response.map(str::trim).unwrap_or_default();
  if text.is_empty() {
    return ExtractedCode {
      code: String::new(),
      source: CodeSource::Empty,
    };
  }

  if let Some((_, rest)) = text.split_once("```python") {
    let body = rest.split("```").next().unwrap_or_default();
    return ExtractedCode {
      code: body.trim().to_string(),
      source: CodeSource::PythonFence,
    };
  }

  let parts: Vec<&str> = text.split("```").collect();
  if parts.len() >= 3 {
    return ExtractedCode {
      code: parts[1].trim().to_string(),
      source: CodeSource::Fence,
    };
  }

  let mut code_lines = Vec::new();
  let mut in_code = false;
  for line in text.lines() {
    let stripped = line.trim();
    if PROSE_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
      if in_code {
        break;
      }
      continue;
    }
    if CODE_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
      in_code = true;
    }
    if in_code {
      code_lines.push(line);
    }
  }

  if code_lines.is_empty() {
    ExtractedCode {
      code: text.to_string(),
      source: CodeSource::Raw,
    }
  } else {
    ExtractedCode {
      code: code_lines.join("\n").trim().to_string(),
      source: CodeSource::Definition,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_python_fence() {
    let reply = "Here you go:\n```python\ndef add(a, b):\n    return a + b\n```\nDone.";
    let extracted = extract_code(Some(reply));
    assert_eq!(extracted.source, CodeSource::PythonFence);
    assert_eq!(extracted.code, "def add(a, b):\n    return a + b");
  }

  #[test]
  fn test_generic_fence() {
    let extracted = extract_code(Some("```\nx = 1\n```"));
    assert_eq!(extracted.source, CodeSource::Fence);
    assert_eq!(extracted.code, "x = 1");
  }

  #[test]
  fn test_definition_until_prose() {
    let reply = "To solve this we iterate.\nimport math\n\ndef area(r):\n    return math.pi * r * r\nThe function returns the area.";
    let extracted = extract_code(Some(reply));
    assert_eq!(extracted.source, CodeSource::Definition);
    assert_eq!(extracted.code, "import math\n\ndef area(r):\n    return math.pi * r * r");
  }

  #[test]
  fn test_raw_and_empty() {
    assert_eq!(extract_code(Some("return 42")).source, CodeSource::Raw);
    assert_eq!(extract_code(None).source, CodeSource::Empty);
    assert_eq!(extract_code(Some("   ")).code, "");
  }
}
