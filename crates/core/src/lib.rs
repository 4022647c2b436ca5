//! Shared types for the agentgreen evaluation harness.
//!
//! - [`Config`]: experiment configuration, loaded once at startup
//! - [`Task`] / [`Design`]: which benchmark task and orchestration pattern a run belongs to
//! - [`SmellLabel`] / [`BinaryLabel`]: the closed label alphabets predictions are normalized into

mod config;
mod label;
mod task;

pub use config::{
  Config, ConfigError, ExperimentConfig, NormalizerConfig, PathsConfig, RuleConfig, RuleKind, TemplatePreset,
};
pub use label::{BinaryLabel, SmellLabel};
pub use task::{AgentPattern, Design, Shot, Task};
