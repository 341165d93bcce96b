//! gapkit agent layer - discovery cycle orchestration.
//!
//! A discovery cycle turns a dependency graph into verified conjectures:
//!
//! - Detect: rank analogical gaps with the core detector
//! - Generate: turn gaps into Lean statements ([`conjecture`], [`llm`])
//! - Filter: drop obviously false statements ([`filter`])
//! - Novelty: drop statements already seen
//! - Prove: build proof attempts ([`proof`]) and verify them in a sandbox
//! - Report: write attempts and metrics ([`metrics`])
//!
//! Every capability is a trait injected through [`DiscoveryCycle::builder`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use gapkit_agent::{CycleConfig, DiscoveryCycle};
//! use gapkit_runtime::GraphCache;
//!
//! # fn main() -> gapkit_agent::Result<()> {
//! let cache = GraphCache::new(8);
//! let mut cycle = DiscoveryCycle::builder(&cache).build()?;
//! let metrics = cycle.run(&CycleConfig::new(
//!     "data/raw/premises.txt",
//!     "data/raw/decl_types.txt",
//!     "data/processed",
//! ))?;
//! println!("{} of {} conjectures verified", metrics.verification_success_count, metrics.conjecture_count);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod conjecture;
pub mod cycle;
pub mod error;
pub mod filter;
pub mod llm;
pub mod metrics;
pub mod pilot;
pub mod proof;

pub use config::{LlmConfig, ProjectConfig};
pub use conjecture::{ConjectureCandidate, ConjectureGenerator, TemplateConjectureGenerator};
pub use cycle::{CycleConfig, CyclePhase, DiscoveryCycle, DiscoveryCycleBuilder};
pub use error::{AgentError, Result};
pub use filter::{BasicCounterexampleFilter, CounterexampleFilter, FilterDecision};
pub use llm::{ChatTransport, OllamaConjectureGenerator};
pub use metrics::{AttemptRecord, CycleMetrics, FailureKind};
pub use pilot::run_pilot;
pub use proof::{ProofAttempt, ProofEngine, SimpleProofEngine};
