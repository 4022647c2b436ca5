//! HumanEval-style code generation problems.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeProblem {
  #[serde(default)]
  pub task_id: String,
  #[serde(default, alias = "description")]
  pub prompt: String,
  #[serde(default)]
  pub entry_point: String,
}

/// Load problems in file order. Problems without a `task_id` are named by position.
pub fn load_code_problems(path: &Path) -> Result<Vec<CodeProblem>> {
  let content = std::fs::read_to_string(path)?;

  let mut problems = Vec::new();
  for (line_no, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    match serde_json::from_str::<CodeProblem>(line) {
      Ok(mut problem) => {
        if problem.task_id.is_empty() {
          problem.task_id = format!("task-{}", problems.len());
        }
        problems.push(problem);
      }
      Err(e) => warn!(line = line_no + 1, err = %e, "Skipping malformed problem"),
    }
  }

  info!(count = problems.len(), path = %path.display(), "Loaded code problems");
  Ok(problems)
}
