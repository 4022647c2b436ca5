//! Evaluation CLI for agentgreen orchestration experiments.
//!
//! Every scoring command follows the same flow: load config, load ground
//! truth, load raw model outputs, normalize each output, score, then write the
//! CSV tables, the normalized dump and a JSON run report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use agentgreen_core::{BinaryLabel, Config, Design, Task, TemplatePreset};
use benchmark::BenchmarkError;
use benchmark::ground_truth::{
  load_anomaly_ground_truth, load_code_problems, load_debt_ground_truth, load_template_ground_truth,
  load_vuln_samples,
};
use benchmark::metrics::{
  AnomalyEvaluation, DebtEvaluation, ParsingEvaluation, VulnEvaluation, evaluate_debt, evaluate_log_analysis,
  evaluate_parsing, evaluate_vulnerability, label_distribution,
};
use benchmark::normalize::{
  Normalized, TemplateNormalizer, classify_log_analysis, classify_td_label, count_fallbacks, extract_code,
  normalize_all,
};
use benchmark::reports::{ComparisonReport, Leaderboard, RunContext, RunReport, TaskSummary, tables};
use benchmark::responses::{RawResponse, load_keyed_responses, load_responses};
use benchmark::verdict::{
  Decision, KeywordMatch, extract_vulnerability_decision, extract_vulnerability_decision_with, parse_direct_answer,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "agentgreen-bench")]
#[command(about = "Normalize and score LLM outputs from agentgreen experiments")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Configuration file (overrides discovery)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

/// Naming and output options shared by the scoring commands.
#[derive(Args)]
struct ExperimentArgs {
  /// Orchestration design, e.g. SA-few or MA-zero
  #[arg(short, long)]
  design: Option<Design>,

  /// Model name recorded in the experiment name and report
  #[arg(short, long)]
  model: Option<String>,

  /// Experiment name used as the output file prefix
  #[arg(long)]
  name: Option<String>,

  /// Output directory (defaults to paths.result_dir)
  #[arg(short, long)]
  output: Option<PathBuf>,
}

#[derive(Args)]
struct ScoreArgs {
  /// Raw model outputs (text lines or JSONL; log analysis reads block_id<TAB>output lines)
  #[arg(long)]
  raw: PathBuf,

  /// Ground truth file
  #[arg(long)]
  gt: PathBuf,

  #[command(flatten)]
  experiment: ExperimentArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum VulnMode {
  /// JSON verdicts from a review board or analyst agent
  Board,
  /// Plain yes/no answers
  Direct,
}

#[derive(Subcommand)]
enum Commands {
  /// Score log parsing templates
  Parsing {
    #[command(flatten)]
    args: ScoreArgs,

    /// Template normalizer preset (overrides config)
    #[arg(short, long)]
    preset: Option<TemplatePreset>,
  },

  /// Score technical-debt smell labels
  Td {
    #[command(flatten)]
    args: ScoreArgs,
  },

  /// Score log anomaly labels keyed by block id
  LogAnalysis {
    #[command(flatten)]
    args: ScoreArgs,
  },

  /// Score vulnerability verdicts
  Vuln {
    #[command(flatten)]
    args: ScoreArgs,

    /// How final answers are phrased
    #[arg(long, value_enum, default_value = "board")]
    mode: VulnMode,

    /// Ignore negated mentions ("not vulnerable") in free-text board answers
    #[arg(long)]
    negation_aware: bool,
  },

  /// Extract Python completions for HumanEval-style problems
  Codegen {
    /// Raw model outputs (JSONL or one response per line)
    #[arg(long)]
    raw: PathBuf,

    /// Problems file (JSONL with task_id)
    #[arg(long)]
    problems: PathBuf,

    #[command(flatten)]
    experiment: ExperimentArgs,
  },

  /// Print normalized outputs without scoring
  Normalize {
    /// Task whose normalizer to apply
    #[arg(short, long)]
    task: Task,

    /// Raw model outputs
    file: PathBuf,

    /// Template normalizer preset (log parsing only)
    #[arg(short, long)]
    preset: Option<TemplatePreset>,
  },

  /// Compare two run reports for regressions
  Compare {
    /// Baseline report (JSON)
    baseline: PathBuf,

    /// Current report (JSON)
    current: PathBuf,

    /// Regression threshold percentage
    #[arg(short, long, default_value = "5")]
    threshold: f64,

    /// Save the comparison as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Rank designs per task from run reports
  Leaderboard {
    /// Run reports (JSON)
    #[arg(required = true)]
    reports: Vec<PathBuf>,

    /// Save the leaderboard as Markdown
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Print a commented default configuration
  InitConfig,
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let mut config = Config::load(cli.config.as_deref())?;
  config.validate()?;
  init_logging(cli.verbose, &config.log_level)?;

  match cli.command {
    Commands::Parsing { args, preset } => run_parsing(&mut config, args, preset),
    Commands::Td { args } => run_td(&mut config, args),
    Commands::LogAnalysis { args } => run_log_analysis(&mut config, args),
    Commands::Vuln {
      args,
      mode,
      negation_aware,
    } => {
      let keywords = if negation_aware {
        KeywordMatch::NegationAware
      } else {
        KeywordMatch::Substring
      };
      run_vuln(&mut config, args, mode, keywords)
    }
    Commands::Codegen {
      raw,
      problems,
      experiment,
    } => run_codegen(&mut config, raw, problems, experiment),
    Commands::Normalize { task, file, preset } => print_normalized(&mut config, task, &file, preset),
    Commands::Compare {
      baseline,
      current,
      threshold,
      output,
    } => compare_reports(baseline, current, threshold, output),
    Commands::Leaderboard { reports, output } => build_leaderboard(reports, output),
    Commands::InitConfig => {
      print!("{}", Config::generate_template());
      Ok(())
    }
  }
}

fn init_logging(verbose: bool, default_level: &str) -> anyhow::Result<()> {
  let default_level = if verbose { "debug" } else { default_level };
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
  let subscriber = FmtSubscriber::builder()
    .with_env_filter(filter)
    .with_target(false)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;
  Ok(())
}

// ============================================================================
// Shared plumbing
// ============================================================================

/// Resolved identity and output location of one scoring run.
struct Run {
  name: String,
  output: PathBuf,
  context: RunContext,
}

impl Run {
  /// Apply CLI overrides to the config and derive the experiment name.
  fn start(config: &mut Config, task: Task, args: ExperimentArgs) -> Self {
    config.experiment.task = task;
    if let Some(design) = args.design {
      config.experiment.design = design;
    }
    if let Some(model) = args.model {
      config.experiment.model = model;
    }

    let name = args.name.unwrap_or_else(|| config.experiment_name(Local::now()));
    let output = args.output.unwrap_or_else(|| config.paths.result_dir.clone());
    let preset = (task == Task::LogParsing).then_some(config.normalizer.preset);
    info!(experiment = %name, output = %output.display(), "Starting evaluation");

    Self {
      context: RunContext {
        experiment: name.clone(),
        design: Some(config.experiment.design),
        model: config.experiment.model.clone(),
        preset,
      },
      name,
      output,
    }
  }

  fn save_report(&self, summary: TaskSummary, distribution: BTreeMap<String, usize>) -> anyhow::Result<()> {
    let path = self.output.join(format!("{}_report.json", self.name));
    RunReport::new(self.context.clone(), summary, distribution).save(&path)?;
    info!(path = %path.display(), "Saved run report");
    Ok(())
  }
}

fn progress_bar(len: usize, message: &'static str) -> anyhow::Result<ProgressBar> {
  let pb = ProgressBar::new(len as u64);
  pb.set_style(
    ProgressStyle::default_bar()
      .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
      .progress_chars("#>-"),
  );
  pb.set_message(message);
  Ok(pb)
}

/// Normalize every response in parallel behind a progress bar.
fn normalize_with_progress<T, F>(responses: &[RawResponse], message: &'static str, f: F) -> anyhow::Result<Vec<T>>
where
  T: Send,
  F: Fn(&RawResponse) -> T + Sync + Send,
{
  let pb = progress_bar(responses.len(), message)?;
  let out = normalize_all(responses, |r| {
    let value = f(r);
    pb.inc(1);
    value
  });
  pb.finish_with_message("done");
  Ok(out)
}

fn template_normalizer(config: &mut Config, preset: Option<TemplatePreset>) -> anyhow::Result<TemplateNormalizer> {
  if let Some(preset) = preset {
    config.normalizer.preset = preset;
  }
  Ok(TemplateNormalizer::from_config(&config.normalizer)?)
}

fn vuln_decision(mode: VulnMode, keywords: KeywordMatch, response: &RawResponse) -> Decision {
  match mode {
    VulnMode::Board => extract_vulnerability_decision_with(response.text(), keywords),
    VulnMode::Direct => parse_direct_answer(response.text()),
  }
}

// ============================================================================
// Log parsing
// ============================================================================

fn run_parsing(config: &mut Config, args: ScoreArgs, preset: Option<TemplatePreset>) -> anyhow::Result<()> {
  let normalizer = template_normalizer(config, preset)?;
  let run = Run::start(config, Task::LogParsing, args.experiment);

  let ground_truth = load_template_ground_truth(&config.resolve_data_path(&args.gt))?;
  let responses = load_responses(&args.raw)?;
  let placeholders = responses.iter().filter(|r| r.is_placeholder()).count();

  let parsed = normalize_with_progress(&responses, "Normalizing templates", |r| {
    normalizer.normalize(r.text().unwrap_or_default())
  })?;
  let templates: Vec<String> = ground_truth.iter().map(|e| e.event_template.clone()).collect();
  let eval = evaluate_parsing(&parsed, &templates)?;

  tables::write_parsing(&eval, &run.output, &run.name)?;
  tables::write_normalized(&parsed, &run.output, &run.name)?;
  run.save_report(TaskSummary::parsing(&eval, placeholders), BTreeMap::new())?;

  print_parsing_summary(&eval, placeholders);
  Ok(())
}

fn print_parsing_summary(eval: &ParsingEvaluation, placeholders: usize) {
  let s = &eval.summary;
  info!(
    accuracy = s.parsing_accuracy,
    edit_similarity = s.average_edit_similarity,
    lcs_similarity = s.average_lcs_similarity,
    "Log parsing evaluated"
  );
  println!("\n=== Log Parsing Evaluation Summary ===");
  println!("Parsing Accuracy:        {:.2}%", s.parsing_accuracy * 100.0);
  println!("Average Edit Similarity: {:.4}", s.average_edit_similarity);
  println!("Average LCS Similarity:  {:.4}", s.average_lcs_similarity);
  println!("Average Edit Distance:   {:.2}", s.average_edit_distance);
  println!("Average LCS Length:      {:.2}", s.average_lcs_length);
  println!(
    "TP: {}, FP: {}, TN: {}, FN: {}",
    s.confusion.tp, s.confusion.fp, s.confusion.tn, s.confusion.fn_
  );
  if placeholders > 0 {
    println!("Empty responses:         {placeholders}");
  }
}

// ============================================================================
// Technical debt
// ============================================================================

fn run_td(config: &mut Config, args: ScoreArgs) -> anyhow::Result<()> {
  let run = Run::start(config, Task::TdDetection, args.experiment);

  let ground_truth = load_debt_ground_truth(&config.resolve_data_path(&args.gt))?;
  let responses = load_responses(&args.raw)?;

  let labels = normalize_with_progress(&responses, "Normalizing smell labels", |r| {
    classify_td_label(r.text())
  })?;
  let eval = evaluate_debt(&ground_truth, &labels)?;

  let normalized: Vec<String> = labels.iter().map(|l| l.label.to_string()).collect();
  tables::write_debt(&eval, &run.output, &run.name)?;
  tables::write_normalized(&normalized, &run.output, &run.name)?;
  run.save_report(TaskSummary::debt(&eval), eval.distribution())?;

  print_debt_summary(&eval);
  Ok(())
}

fn print_debt_summary(eval: &DebtEvaluation) {
  let c = eval.confusion;
  info!(accuracy = eval.accuracy, fallbacks = eval.fallbacks, "Technical debt evaluated");
  println!("\n=== Technical Debt Detection Evaluation Summary ===");
  println!("Accuracy: {:.2}%", eval.accuracy * 100.0);
  println!("TP: {} | FP: {} | TN: {} | FN: {}", c.tp, c.fp, c.tn, c.fn_);
  println!("Defaulted labels: {}", eval.fallbacks);
  print_distribution(&eval.distribution());
}

fn print_distribution(distribution: &BTreeMap<String, usize>) {
  let parts: Vec<String> = distribution.iter().map(|(label, n)| format!("{label}: {n}")).collect();
  println!("Predicted labels: {}", parts.join(", "));
}

// ============================================================================
// Log anomaly analysis
// ============================================================================

fn run_log_analysis(config: &mut Config, args: ScoreArgs) -> anyhow::Result<()> {
  let run = Run::start(config, Task::LogAnalysis, args.experiment);

  let ground_truth = load_anomaly_ground_truth(&config.resolve_data_path(&args.gt))?;
  let responses = load_keyed_responses(&args.raw)?;

  let labels = normalize_with_progress(&responses, "Normalizing anomaly labels", |r| {
    classify_log_analysis(r.text())
  })?;

  // JSONL records without an id are matched to ground-truth blocks by position.
  let mut predictions: Vec<(String, Normalized<BinaryLabel>)> = Vec::with_capacity(labels.len());
  for (idx, (response, label)) in responses.iter().zip(labels).enumerate() {
    let block_id = response
      .key
      .clone()
      .or_else(|| ground_truth.get(idx).map(|e| e.block_id.clone()));
    match block_id {
      Some(block_id) => predictions.push((block_id, label)),
      None => warn!(line = idx + 1, "Response has no block id and no positional counterpart"),
    }
  }

  let eval = evaluate_log_analysis(&ground_truth, &predictions);

  let normalized: Vec<String> = predictions
    .iter()
    .map(|(block_id, label)| format!("{block_id}\t{}", label.label))
    .collect();
  tables::write_log_analysis(&eval, &run.output, &run.name)?;
  tables::write_normalized(&normalized, &run.output, &run.name)?;
  run.save_report(TaskSummary::log_analysis(&eval), eval.distribution())?;

  print_log_analysis_summary(&eval);
  Ok(())
}

fn print_log_analysis_summary(eval: &AnomalyEvaluation) {
  let c = eval.confusion;
  info!(
    accuracy = eval.accuracy,
    f1 = eval.f1,
    missing = eval.missing,
    unmatched = eval.unmatched,
    "Log analysis evaluated"
  );
  println!("\n=== Log Analysis Evaluation Summary ===");
  println!("Accuracy:  {:.2}%", eval.accuracy * 100.0);
  println!("Precision: {:.4}", eval.precision);
  println!("Recall:    {:.4}", eval.recall);
  println!("F1:        {:.4}", eval.f1);
  println!("TP: {} | FP: {} | TN: {} | FN: {}", c.tp, c.fp, c.tn, c.fn_);
  println!(
    "Missing blocks: {} | Unmatched predictions: {} | Defaulted labels: {}",
    eval.missing, eval.unmatched, eval.fallbacks
  );
}

// ============================================================================
// Vulnerability detection
// ============================================================================

fn run_vuln(config: &mut Config, args: ScoreArgs, mode: VulnMode, keywords: KeywordMatch) -> anyhow::Result<()> {
  let run = Run::start(config, Task::VulnDetection, args.experiment);

  let samples = load_vuln_samples(&config.resolve_data_path(&args.gt))?;
  let responses = load_responses(&args.raw)?;

  let decisions = normalize_with_progress(&responses, "Extracting verdicts", |r| {
    vuln_decision(mode, keywords, r)
  })?;
  let eval = evaluate_vulnerability(&samples, &decisions)?;

  let normalized: Vec<String> = decisions.iter().map(|d| d.vulnerable.to_string()).collect();
  tables::write_vulnerability(&eval, &run.output, &run.name)?;
  tables::write_normalized(&normalized, &run.output, &run.name)?;
  run.save_report(TaskSummary::vulnerability(&eval), eval.distribution())?;

  print_vuln_summary(&eval);
  Ok(())
}

fn print_vuln_summary(eval: &VulnEvaluation) {
  let c = eval.confusion;
  let p = eval.pairwise;
  info!(accuracy = eval.accuracy, p_c = p.p_c, fallbacks = eval.fallbacks, "Vulnerability detection evaluated");
  println!("\n=== Vulnerability Detection Evaluation Summary ===");
  println!("Accuracy: {:.4}", eval.accuracy);
  println!("TP: {} | FP: {} | TN: {} | FN: {}", c.tp, c.fp, c.tn, c.fn_);
  println!(
    "P-C: {:.2}% | P-V: {:.2}% | P-B: {:.2}% | P-R: {:.2}% | FPR: {:.2}%",
    p.p_c, p.p_v, p.p_b, p.p_r, p.fpr
  );
  println!("Defaulted verdicts: {}", eval.fallbacks);
}

// ============================================================================
// Code generation
// ============================================================================

fn run_codegen(config: &mut Config, raw: PathBuf, problems: PathBuf, args: ExperimentArgs) -> anyhow::Result<()> {
  let run = Run::start(config, Task::CodeGeneration, args);

  let problems = load_code_problems(&config.resolve_data_path(&problems))?;
  let responses = load_responses(&raw)?;
  if responses.len() != problems.len() {
    return Err(
      BenchmarkError::LengthMismatch {
        predictions: responses.len(),
        ground_truth: problems.len(),
      }
      .into(),
    );
  }

  let extracted = normalize_with_progress(&responses, "Extracting code", |r| extract_code(r.text()))?;
  let completions: Vec<(String, String)> = problems
    .iter()
    .zip(&extracted)
    .map(|(p, e)| (p.task_id.clone(), e.code.clone()))
    .collect();
  let sources = label_distribution(extracted.iter().map(|e| e.source));

  tables::write_completions(&completions, &run.output, &run.name)?;
  run.save_report(
    TaskSummary::CodeGeneration {
      problems: problems.len(),
      sources: sources.clone(),
    },
    BTreeMap::new(),
  )?;

  info!(problems = problems.len(), "Completions extracted");
  println!("\n=== Code Generation Extraction Summary ===");
  println!("Problems: {}", problems.len());
  print_distribution(&sources);
  Ok(())
}

// ============================================================================
// Normalize only
// ============================================================================

fn print_normalized(config: &mut Config, task: Task, file: &Path, preset: Option<TemplatePreset>) -> anyhow::Result<()> {
  let responses = match task {
    Task::LogAnalysis => load_keyed_responses(file)?,
    _ => load_responses(file)?,
  };

  let lines: Vec<String> = match task {
    Task::LogParsing => {
      let normalizer = template_normalizer(config, preset)?;
      normalize_all(&responses, |r| normalizer.normalize(r.text().unwrap_or_default()))
    }
    Task::TdDetection => {
      let labels = normalize_all(&responses, |r| classify_td_label(r.text()));
      info!(fallbacks = count_fallbacks(&labels), "Smell labels normalized");
      labels.iter().map(|l| l.label.to_string()).collect()
    }
    Task::LogAnalysis => normalize_all(&responses, |r| {
      let label = classify_log_analysis(r.text()).label;
      match &r.key {
        Some(key) => format!("{key}\t{label}"),
        None => label.to_string(),
      }
    }),
    Task::VulnDetection => normalize_all(&responses, |r| {
      let decision = extract_vulnerability_decision(r.text());
      format!("{}\t{}", decision.vulnerable, decision.reasoning.replace('\n', " "))
    }),
    Task::CodeGeneration => {
      let extracted = normalize_all(&responses, |r| extract_code(r.text()));
      extracted
        .iter()
        .map(|e| serde_json::to_string(&e.code))
        .collect::<Result<_, _>>()?
    }
  };

  for line in lines {
    println!("{line}");
  }
  Ok(())
}

// ============================================================================
// Comparison and leaderboard
// ============================================================================

fn compare_reports(baseline: PathBuf, current: PathBuf, threshold: f64, output: Option<PathBuf>) -> anyhow::Result<()> {
  info!(
    "Comparing {} vs {} (threshold: {:.0}%)",
    baseline.display(),
    current.display(),
    threshold
  );

  let comparison = ComparisonReport::from_files(&baseline, &current, threshold)?;
  println!("{}", comparison.to_markdown());

  if let Some(output) = output {
    comparison.save(&output)?;
    info!("Comparison saved to: {}", output.display());
  }

  if !comparison.summary.passes {
    std::process::exit(1);
  }
  Ok(())
}

fn build_leaderboard(paths: Vec<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
  let mut reports = Vec::with_capacity(paths.len());
  for path in &paths {
    match RunReport::load(path) {
      Ok(report) => reports.push(report),
      Err(e) => warn!(path = %path.display(), err = %e, "Skipping unreadable report"),
    }
  }
  if reports.is_empty() {
    anyhow::bail!("No readable run reports among {} paths", paths.len());
  }

  let leaderboard = Leaderboard::from_reports(&reports);
  println!("{}", leaderboard.as_str());

  if let Some(output) = output {
    leaderboard.save(&output)?;
    info!("Leaderboard saved to: {}", output.display());
  }
  Ok(())
}
