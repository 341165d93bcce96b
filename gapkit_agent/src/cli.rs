//! Command-line interface for gapkit.
//!
//! ```bash
//! $ gapkit detect --top-k 50
//! $ gapkit pilot --output-dir data/processed
//! $ gapkit evaluate --metrics-path data/processed/phase1_metrics.json \
//!                   --labels-csv data/processed/top20_label_template.csv
//! $ gapkit cycle --generator template --sandbox-command "nsjail --quiet"
//! $ gapkit seeds Mathlib/Algebra/Group/Basic.lean
//! ```
//!
//! Configuration and missing-input errors exit with status 1 and a message
//! on stderr. A cycle whose verification runtime is not ready also exits 1,
//! after writing its artifacts, and prints the skipped reason.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use gapkit_core::gaps::evaluation::evaluate_metrics_file;
use gapkit_core::gaps::report::{to_sorted_json, write_gap_report};
use gapkit_core::gaps::seeds::scan_seed_annotations;
use gapkit_core::{AnalogicalGapDetector, DependencyGraph, GapDetectorConfig};
use gapkit_runtime::GraphCache;
use tracing_subscriber::EnvFilter;

use crate::config::ProjectConfig;
use crate::conjecture::TemplateConjectureGenerator;
use crate::cycle::{CycleConfig, DiscoveryCycle};
use crate::llm::OllamaConjectureGenerator;
use crate::pilot::run_pilot;

#[derive(Parser, Debug)]
#[command(name = "gapkit")]
#[command(about = "Analogical gap detection and discovery cycles over Mathlib", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML project configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    #[arg(long)]
    premises_path: Option<PathBuf>,
    #[arg(long)]
    decl_types_path: Option<PathBuf>,
}

impl InputArgs {
    fn resolve(&self, config: &ProjectConfig) -> (PathBuf, PathBuf) {
        (
            self.premises_path.clone().unwrap_or_else(|| config.premises_path()),
            self.decl_types_path.clone().unwrap_or_else(|| config.decl_types_path()),
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum GeneratorKind {
    Template,
    Llm,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect analogical gaps and write them as JSONL
    Detect {
        #[command(flatten)]
        inputs: InputArgs,
        /// Defaults to <data_processed_dir>/gap_candidates.jsonl
        #[arg(long)]
        output_path: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        top_k: usize,
        #[arg(long, default_value_t = 0.2)]
        min_score: f64,
    },

    /// Write phase-1 artifacts for human labeling
    Pilot {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        top_k: usize,
    },

    /// Score labeled candidates and update the metrics file with go/no-go
    Evaluate {
        #[arg(long)]
        metrics_path: PathBuf,
        #[arg(long)]
        labels_csv: PathBuf,
        /// Defaults to the metrics file's own top_k
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Run one discovery cycle: gaps, conjectures, proof attempts, verification
    Cycle {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        top_k: usize,
        /// Defaults to proof_local_retries from the configuration
        #[arg(long)]
        proof_retry_budget: Option<usize>,
        #[arg(long, value_enum, default_value_t = GeneratorKind::Template)]
        generator: GeneratorKind,
        /// Run Lean without a sandbox
        #[arg(long)]
        trusted_local_run: bool,
        /// Whitespace-separated sandbox prefix, e.g. "nsjail --quiet"
        #[arg(long)]
        sandbox_command: Option<String>,
        /// Skip the input allow-list (sandboxed runs only)
        #[arg(long)]
        allow_arbitrary_input: bool,
    },

    /// List TODO and sorry annotations in Lean files
    Seeds {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second init in the same process keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses arguments from the process and runs the chosen command.
pub fn run() -> anyhow::Result<ExitCode> {
    run_from(std::env::args_os())
}

/// Runs with explicit arguments (the first one is the program name).
pub fn run_from<I, T>(args: I) -> anyhow::Result<ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing();
    let config = ProjectConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Detect {
            inputs,
            output_path,
            top_k,
            min_score,
        } => {
            let (premises_path, decl_types_path) = inputs.resolve(&config);
            let (premises, declarations) =
                gapkit_core::parser::load_records(&premises_path, &decl_types_path)?;
            let graph = DependencyGraph::from_records(&premises, &declarations);
            let detector_config = GapDetectorConfig {
                family_prefixes: config.algebra_name_prefixes.clone(),
                min_score,
                top_k,
                ..GapDetectorConfig::default()
            };
            detector_config.validate()?;
            let candidates = AnalogicalGapDetector::new(detector_config).detect(&graph, Some(top_k));
            let output_path =
                output_path.unwrap_or_else(|| config.data_processed_dir.join("gap_candidates.jsonl"));
            write_gap_report(&candidates, &output_path)?;
            tracing::info!(count = candidates.len(), path = %output_path.display(), "gap report written");
            Ok(ExitCode::SUCCESS)
        }

        Command::Pilot {
            inputs,
            output_dir,
            top_k,
        } => {
            let (premises_path, decl_types_path) = inputs.resolve(&config);
            let output_dir = output_dir.unwrap_or_else(|| config.data_processed_dir.clone());
            run_pilot(&premises_path, &decl_types_path, &output_dir, top_k)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Evaluate {
            metrics_path,
            labels_csv,
            top_k,
        } => {
            let evaluation = evaluate_metrics_file(&metrics_path, &labels_csv, top_k, &config.thresholds)?;
            println!("{}", to_sorted_json(&evaluation)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Cycle {
            inputs,
            output_dir,
            top_k,
            proof_retry_budget,
            generator,
            trusted_local_run,
            sandbox_command,
            allow_arbitrary_input,
        } => {
            let (premises_path, decl_types_path) = inputs.resolve(&config);
            let mut verifier_config = config.verifier_config();
            verifier_config.trusted_local_run |= trusted_local_run;
            verifier_config.allow_arbitrary_input |= allow_arbitrary_input;
            if let Some(prefix) = sandbox_command {
                verifier_config.sandbox_command = prefix.split_whitespace().map(str::to_string).collect();
            }

            let cycle_config = CycleConfig {
                top_k,
                proof_retry_budget: proof_retry_budget.unwrap_or(config.proof_local_retries),
                family_prefixes: config.algebra_name_prefixes.clone(),
                ..CycleConfig::new(
                    premises_path,
                    decl_types_path,
                    output_dir.unwrap_or_else(|| config.data_processed_dir.clone()),
                )
            };
            cycle_config.validate()?;

            let cache = GraphCache::new(config.graph_cache_size);
            let builder = DiscoveryCycle::builder(&cache)
                .project(&config)
                .verifier_config(verifier_config);
            let mut cycle = match generator {
                GeneratorKind::Template => builder.generator(TemplateConjectureGenerator::new()),
                GeneratorKind::Llm => builder.generator(OllamaConjectureGenerator::new(&config.llm)?),
            }
            .build()?;

            let metrics = cycle.run(&cycle_config)?;
            println!("{}", to_sorted_json(&metrics)?);
            if !metrics.runtime_ready {
                if let Some(reason) = &metrics.skipped_reason {
                    eprintln!("{}", reason);
                    return Ok(ExitCode::FAILURE);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Seeds { paths } => {
            for hint in scan_seed_annotations(&paths)? {
                println!("{}", to_sorted_json(&hint)?);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
