//! Experiment configuration.
//!
//! Config priority: explicit path > `$AGENTGREEN_CONFIG` > `./agentgreen.toml` >
//! user (~/.config/agentgreen/config.toml) > built-in defaults.
//!
//! The configuration is loaded once at startup; command-line flags may override
//! individual fields before a run begins and nothing mutates it afterwards.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::task::{Design, Task};

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "agentgreen.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "AGENTGREEN_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("Invalid config value: {0}")]
  Invalid(String),
}

// ============================================================================
// Paths
// ============================================================================

/// Where datasets are read from and results are written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
  /// Directory that relative ground-truth paths are resolved against
  pub data_dir: PathBuf,
  /// Directory for per-run CSV, JSON and normalized output files
  pub result_dir: PathBuf,
}

impl Default for PathsConfig {
  fn default() -> Self {
    Self {
      data_dir: PathBuf::from("data"),
      result_dir: PathBuf::from("results"),
    }
  }
}

// ============================================================================
// Experiment
// ============================================================================

/// Which task, design and model a run belongs to. Used for naming output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
  pub task: Task,
  pub design: Design,
  /// Model identifier as given to the LLM service (e.g. "qwen3:4b-instruct")
  pub model: String,
}

impl Default for ExperimentConfig {
  fn default() -> Self {
    Self {
      task: Task::default(),
      design: Design::default(),
      model: "qwen3:4b-instruct".to_string(),
    }
  }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Named rule set for template normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplatePreset {
  /// Fences, control tokens and a short list of stop phrases only
  Legacy,
  /// Full cleanup with explanation truncation and quoted-answer extraction
  #[default]
  Standard,
  /// Looks for explicit "The template should be ..." style answers first
  Extractive,
  /// Like extractive, but also drops apologies and picks quoted templates
  Conversational,
}

impl TemplatePreset {
  pub fn as_str(&self) -> &'static str {
    match self {
      TemplatePreset::Legacy => "legacy",
      TemplatePreset::Standard => "standard",
      TemplatePreset::Extractive => "extractive",
      TemplatePreset::Conversational => "conversational",
    }
  }
}

impl std::str::FromStr for TemplatePreset {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "legacy" | "old" => Ok(TemplatePreset::Legacy),
      "standard" | "main" => Ok(TemplatePreset::Standard),
      "extractive" | "v1" => Ok(TemplatePreset::Extractive),
      "conversational" | "v2" => Ok(TemplatePreset::Conversational),
      _ => Err(format!("Invalid template preset: {}", s)),
    }
  }
}

/// What a configured rule does when its pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
  /// Delete every match
  Strip,
  /// Discard the text from the first match onwards
  Stop,
  /// The first capture group is the final answer
  Capture,
  /// Keep only the first capture group and continue
  Focus,
}

/// A user-supplied normalization rule (regex syntax of the `regex` crate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
  pub kind: RuleKind,
  pub pattern: String,
}

/// Template normalizer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
  /// Built-in rule set
  pub preset: TemplatePreset,
  /// Extra rules, applied in order before the preset's rules
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub rules: Vec<RuleConfig>,
}

// ============================================================================
// Main Configuration
// ============================================================================

/// agentgreen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Default log level (RUST_LOG takes precedence)
  pub log_level: String,

  #[serde(default)]
  pub paths: PathsConfig,

  #[serde(default)]
  pub experiment: ExperimentConfig,

  #[serde(default)]
  pub normalizer: NormalizerConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      log_level: "info".to_string(),
      paths: PathsConfig::default(),
      experiment: ExperimentConfig::default(),
      normalizer: NormalizerConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration following the documented priority order.
  ///
  /// An explicitly named file (argument or environment) must exist. Discovered
  /// files are optional, but a discovered file that fails to parse is an error
  /// rather than being silently replaced by defaults.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::from_file(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
      && !path.is_empty()
    {
      return Self::from_file(Path::new(&path));
    }

    let project_config = PathBuf::from(PROJECT_CONFIG_FILE);
    if project_config.exists() {
      return Self::from_file(&project_config);
    }

    if let Some(user_config) = Self::user_config_path()
      && user_config.exists()
    {
      return Self::from_file(&user_config);
    }

    Ok(Self::default())
  }

  /// Parse a config file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("agentgreen").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("agentgreen").join("config.toml"))
  }

  /// Resolve a dataset path: absolute paths and paths that exist as given are
  /// used unchanged, anything else is taken relative to `paths.data_dir`.
  pub fn resolve_data_path(&self, path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
      path.to_path_buf()
    } else {
      self.paths.data_dir.join(path)
    }
  }

  /// Experiment name `{task}_{design}_{model}_{timestamp}` used as the prefix of every output file.
  pub fn experiment_name(&self, now: DateTime<Local>) -> String {
    let model = self.experiment.model.replace([':', '/'], "-");
    format!(
      "{}_{}_{}_{}",
      self.experiment.task,
      self.experiment.design,
      model,
      now.format("%Y%m%d-%H%M%S")
    )
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();
    format!(
      r#"# agentgreen configuration
# Place in ./{project} or ~/.config/agentgreen/config.toml, or point ${env} at a file.

# Default log level (trace, debug, info, warn, error). RUST_LOG overrides it.
log_level = "{log_level}"

[paths]
# Relative ground-truth paths are resolved against this directory
data_dir = "{data_dir}"
# Per-run CSV / JSON / normalized outputs are written here
result_dir = "{result_dir}"

[experiment]
# log-parsing | log-analysis | td-detection | vuln-detection | code-generation
task = "{task}"
# NA | SA | DA | MA, followed by -zero or -few
design = "{design}"
model = "{model}"

[normalizer]
# legacy | standard | extractive | conversational
preset = "{preset}"

# Extra rules run before the preset, in order. kind = strip | stop | capture | focus
# [[normalizer.rules]]
# kind = "strip"
# pattern = "(?i)^Answer:\\s*"
"#,
      project = PROJECT_CONFIG_FILE,
      env = CONFIG_ENV_VAR,
      log_level = defaults.log_level,
      data_dir = defaults.paths.data_dir.display(),
      result_dir = defaults.paths.result_dir.display(),
      task = defaults.experiment.task,
      design = defaults.experiment.design,
      model = defaults.experiment.model,
      preset = defaults.normalizer.preset.as_str(),
    )
  }

  /// Reject values that deserialize but cannot be used.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.experiment.model.trim().is_empty() {
      return Err(ConfigError::Invalid("experiment.model must not be empty".into()));
    }
    if let Some(rule) = self.normalizer.rules.iter().find(|r| r.pattern.is_empty()) {
      return Err(ConfigError::Invalid(format!(
        "normalizer rule of kind {:?} has an empty pattern",
        rule.kind
      )));
    }
    Ok(())
  }
}
