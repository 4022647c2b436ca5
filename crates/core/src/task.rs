//! Benchmark tasks and orchestration designs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Benchmark task a run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
  #[default]
  LogParsing,
  LogAnalysis,
  TdDetection,
  VulnDetection,
  CodeGeneration,
}

impl Task {
  pub fn as_str(&self) -> &'static str {
    match self {
      Task::LogParsing => "log-parsing",
      Task::LogAnalysis => "log-analysis",
      Task::TdDetection => "td-detection",
      Task::VulnDetection => "vuln-detection",
      Task::CodeGeneration => "code-generation",
    }
  }
}

impl fmt::Display for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Task {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().replace('_', "-").as_str() {
      "log-parsing" | "parsing" => Ok(Task::LogParsing),
      "log-analysis" | "anomaly" => Ok(Task::LogAnalysis),
      "td-detection" | "td" => Ok(Task::TdDetection),
      "vuln-detection" | "vuln" | "vulnerability" => Ok(Task::VulnDetection),
      "code-generation" | "codegen" => Ok(Task::CodeGeneration),
      _ => Err(format!("Invalid task: {}", s)),
    }
  }
}

/// How many agents take part in producing an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentPattern {
  /// Direct model call, no agent framework
  NoAgent,
  /// One assistant agent
  SingleAgent,
  /// Generator plus critic
  DualAgent,
  /// Generator, critic and refiner (or a full review board)
  MultiAgent,
}

impl AgentPattern {
  pub fn code(&self) -> &'static str {
    match self {
      AgentPattern::NoAgent => "NA",
      AgentPattern::SingleAgent => "SA",
      AgentPattern::DualAgent => "DA",
      AgentPattern::MultiAgent => "MA",
    }
  }
}

/// Prompting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shot {
  Zero,
  Few,
}

/// An orchestration design such as `SA-few` or `MA-zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Design {
  pub pattern: AgentPattern,
  pub shot: Shot,
}

impl Design {
  pub fn new(pattern: AgentPattern, shot: Shot) -> Self {
    Self { pattern, shot }
  }
}

impl Default for Design {
  fn default() -> Self {
    Self::new(AgentPattern::SingleAgent, Shot::Few)
  }
}

impl fmt::Display for Design {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let shot = match self.shot {
      Shot::Zero => "zero",
      Shot::Few => "few",
    };
    write!(f, "{}-{}", self.pattern.code(), shot)
  }
}

impl FromStr for Design {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (pattern, shot) = s
      .split_once(['-', '_'])
      .ok_or_else(|| format!("Invalid design: {} (expected e.g. SA-few)", s))?;

    let pattern = match pattern.to_uppercase().as_str() {
      "NA" => AgentPattern::NoAgent,
      "SA" => AgentPattern::SingleAgent,
      "DA" => AgentPattern::DualAgent,
      "MA" => AgentPattern::MultiAgent,
      other => return Err(format!("Invalid agent pattern: {}", other)),
    };

    let shot = match shot.to_lowercase().trim_end_matches("_shot").trim_end_matches("-shot") {
      "zero" => Shot::Zero,
      "few" => Shot::Few,
      other => return Err(format!("Invalid shot style: {}", other)),
    };

    Ok(Self { pattern, shot })
  }
}

impl TryFrom<String> for Design {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Design> for String {
  fn from(design: Design) -> Self {
    design.to_string()
  }
}
