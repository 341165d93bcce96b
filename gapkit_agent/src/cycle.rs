//! Discovery cycle orchestrator.
//!
//! One cycle sequences the phases
//! `Init -> GraphReady -> GapsDetected -> ConjecturesGenerated -> Filtered
//! -> NoveltyChecked -> (Skipped | ProofAttempts) -> MetricsWritten`.
//! Configuration and missing-input errors abort before anything is written.
//! An unready verification runtime is recorded in the metrics instead.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use gapkit_core::gaps::report::{to_sorted_json, to_sorted_json_pretty, write_gap_report};
use gapkit_core::{AnalogicalGapDetector, GapDetectorConfig, NoveltyCheck, NoveltyChecker, NoveltyReason};
use gapkit_runtime::{GraphCache, LeanRunner, SandboxedVerifier, Verifier, VerifierConfig};

use crate::config::{ProjectConfig, ALGEBRA_NAME_PREFIXES, DEFAULT_LEAN_PROJECT_DIR};
use crate::conjecture::{write_conjectures, ConjectureCandidate, ConjectureGenerator, TemplateConjectureGenerator};
use crate::error::{AgentError, Result};
use crate::filter::{BasicCounterexampleFilter, CounterexampleFilter};
use crate::metrics::{AttemptRecord, CycleArtifacts, CycleMetrics};
use crate::proof::{ProofEngine, SimpleProofEngine};

pub const GAP_CANDIDATES_FILE: &str = "gap_candidates.jsonl";
pub const CONJECTURES_FILE: &str = "phase2_conjectures.jsonl";
pub const ATTEMPTS_FILE: &str = "phase2_attempts.jsonl";
pub const METRICS_FILE: &str = "phase2_cycle_metrics.json";

/// Phase of a discovery cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Init,
    GraphReady,
    GapsDetected,
    ConjecturesGenerated,
    Filtered,
    NoveltyChecked,
    Skipped,
    ProofAttempts,
    MetricsWritten,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Init => "init",
            CyclePhase::GraphReady => "graph_ready",
            CyclePhase::GapsDetected => "gaps_detected",
            CyclePhase::ConjecturesGenerated => "conjectures_generated",
            CyclePhase::Filtered => "filtered",
            CyclePhase::NoveltyChecked => "novelty_checked",
            CyclePhase::Skipped => "skipped",
            CyclePhase::ProofAttempts => "proof_attempts",
            CyclePhase::MetricsWritten => "metrics_written",
        };
        f.write_str(name)
    }
}

/// Inputs and bounds of one cycle.
#[derive(Clone, Debug)]
pub struct CycleConfig {
    pub premises_path: PathBuf,
    pub decl_types_path: PathBuf,
    pub output_dir: PathBuf,
    pub top_k: usize,
    pub proof_retry_budget: usize,
    pub family_prefixes: Vec<String>,
}

impl CycleConfig {
    pub fn new(
        premises_path: impl Into<PathBuf>,
        decl_types_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            premises_path: premises_path.into(),
            decl_types_path: decl_types_path.into(),
            output_dir: output_dir.into(),
            top_k: 20,
            proof_retry_budget: 3,
            family_prefixes: ALGEBRA_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(AgentError::InvalidConfig("top_k must be a positive integer".to_string()));
        }
        if self.proof_retry_budget == 0 {
            return Err(AgentError::InvalidConfig(
                "proof_retry_budget must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`DiscoveryCycle`]; unset capabilities get the defaults.
///
/// Without an explicit verifier the cycle builds a [`SandboxedVerifier`]
/// from `verifier_config`, running Lean from `lean_project_dir`.
pub struct DiscoveryCycleBuilder<'a> {
    cache: &'a GraphCache,
    lean_project_dir: PathBuf,
    verifier_config: VerifierConfig,
    generator: Option<Box<dyn ConjectureGenerator + 'a>>,
    filter: Option<Box<dyn CounterexampleFilter + 'a>>,
    novelty: Option<Box<dyn NoveltyCheck + 'a>>,
    proof_engine: Option<Box<dyn ProofEngine + 'a>>,
    verifier: Option<Box<dyn Verifier + 'a>>,
}

impl<'a> DiscoveryCycleBuilder<'a> {
    /// Takes the Lean project dir and verifier settings from `config`.
    pub fn project(mut self, config: &ProjectConfig) -> Self {
        self.lean_project_dir = config.lean_project_dir.clone();
        self.verifier_config = config.verifier_config();
        self
    }

    pub fn lean_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lean_project_dir = dir.into();
        self
    }

    pub fn verifier_config(mut self, config: VerifierConfig) -> Self {
        self.verifier_config = config;
        self
    }

    /// The verifier `build` falls back to when none was injected.
    pub fn default_verifier(&self) -> Result<SandboxedVerifier> {
        Ok(SandboxedVerifier::with_runner(
            self.verifier_config.clone(),
            LeanRunner::with_project_dir(&self.lean_project_dir),
        )?)
    }

    pub fn generator(mut self, generator: impl ConjectureGenerator + 'a) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn filter(mut self, filter: impl CounterexampleFilter + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn novelty(mut self, novelty: impl NoveltyCheck + 'a) -> Self {
        self.novelty = Some(Box::new(novelty));
        self
    }

    pub fn proof_engine(mut self, engine: impl ProofEngine + 'a) -> Self {
        self.proof_engine = Some(Box::new(engine));
        self
    }

    pub fn verifier(mut self, verifier: impl Verifier + 'a) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    pub fn build(mut self) -> Result<DiscoveryCycle<'a>> {
        let verifier: Box<dyn Verifier + 'a> = match self.verifier.take() {
            Some(verifier) => verifier,
            None => Box::new(self.default_verifier()?),
        };
        Ok(DiscoveryCycle {
            cache: self.cache,
            generator: self
                .generator
                .unwrap_or_else(|| Box::new(TemplateConjectureGenerator::new())),
            filter: self.filter.unwrap_or_else(|| Box::new(BasicCounterexampleFilter)),
            novelty: self.novelty.unwrap_or_else(|| Box::new(NoveltyChecker::new())),
            proof_engine: self
                .proof_engine
                .unwrap_or_else(|| Box::new(SimpleProofEngine::default())),
            verifier,
        })
    }
}

/// Gap -> conjecture -> filter -> novelty -> proof attempts -> verification.
pub struct DiscoveryCycle<'a> {
    cache: &'a GraphCache,
    generator: Box<dyn ConjectureGenerator + 'a>,
    filter: Box<dyn CounterexampleFilter + 'a>,
    novelty: Box<dyn NoveltyCheck + 'a>,
    proof_engine: Box<dyn ProofEngine + 'a>,
    verifier: Box<dyn Verifier + 'a>,
}

fn enter(phase: CyclePhase) {
    tracing::info!(%phase, "cycle phase");
}

fn path_text(path: &Path) -> String {
    path.display().to_string()
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl<'a> DiscoveryCycle<'a> {
    pub fn builder(cache: &'a GraphCache) -> DiscoveryCycleBuilder<'a> {
        DiscoveryCycleBuilder {
            cache,
            lean_project_dir: PathBuf::from(DEFAULT_LEAN_PROJECT_DIR),
            verifier_config: VerifierConfig::default(),
            generator: None,
            filter: None,
            novelty: None,
            proof_engine: None,
            verifier: None,
        }
    }

    /// Runs one cycle and returns the metrics that were written.
    pub fn run(&mut self, config: &CycleConfig) -> Result<CycleMetrics> {
        enter(CyclePhase::Init);
        config.validate()?;
        self.check_proof_budget(config.proof_retry_budget)?;
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut metrics = CycleMetrics::new(started_at, config.top_k, config.proof_retry_budget);

        let (graph, cache_hit) = self
            .cache
            .get_or_load(&config.premises_path, &config.decl_types_path)?;
        metrics.graph_cache_hit = cache_hit;
        enter(CyclePhase::GraphReady);

        let detector = AnalogicalGapDetector::new(GapDetectorConfig {
            family_prefixes: config.family_prefixes.clone(),
            top_k: config.top_k,
            ..GapDetectorConfig::default()
        });
        let gaps = detector.detect(&graph, Some(config.top_k));
        metrics.gap_count = gaps.len();
        enter(CyclePhase::GapsDetected);

        let mut conjectures = self.generator.generate(&gaps, config.top_k);
        conjectures.truncate(config.top_k);
        metrics.conjecture_count = conjectures.len();
        enter(CyclePhase::ConjecturesGenerated);

        fs::create_dir_all(&config.output_dir)?;
        let artifacts = CycleArtifacts {
            gap_candidates_path: path_text(&config.output_dir.join(GAP_CANDIDATES_FILE)),
            conjectures_path: path_text(&config.output_dir.join(CONJECTURES_FILE)),
            attempts_path: path_text(&config.output_dir.join(ATTEMPTS_FILE)),
            metrics_path: path_text(&config.output_dir.join(METRICS_FILE)),
        };
        write_gap_report(&gaps, Path::new(&artifacts.gap_candidates_path))?;
        write_conjectures(&conjectures, Path::new(&artifacts.conjectures_path))?;

        let survivors = self.apply_filter(conjectures, &mut metrics);
        enter(CyclePhase::Filtered);

        let verifiable = self.apply_novelty(survivors, &mut metrics);
        metrics.verifiable_count = verifiable.len();
        enter(CyclePhase::NoveltyChecked);

        let status = self.verifier.runtime_status();
        metrics.verifier_available = status.lean_available;
        metrics.sandbox_available = status.sandbox_available;
        metrics.runtime_ready = status.runtime_ready;
        metrics.verification_mode = status.verification_mode;

        let mut attempts_out = BufWriter::new(File::create(&artifacts.attempts_path)?);
        if status.runtime_ready {
            enter(CyclePhase::ProofAttempts);
            for conjecture in &verifiable {
                self.attempt_proofs(conjecture, config.proof_retry_budget, &mut attempts_out, &mut metrics)?;
            }
        } else {
            enter(CyclePhase::Skipped);
            metrics.skipped_reason = status.skipped_reason();
            tracing::warn!(reason = ?metrics.skipped_reason, "verification skipped");
        }
        attempts_out.flush()?;

        metrics.artifacts = artifacts;
        metrics.finish(elapsed_ms(clock));
        fs::write(&metrics.artifacts.metrics_path, to_sorted_json_pretty(&metrics)?)?;
        enter(CyclePhase::MetricsWritten);
        tracing::info!(
            gaps = metrics.gap_count,
            conjectures = metrics.conjecture_count,
            successes = metrics.verification_success_count,
            "cycle finished"
        );
        Ok(metrics)
    }

    fn check_proof_budget(&self, budget: usize) -> Result<()> {
        match self.proof_engine.supported_attempts() {
            Some(supported) if budget > supported => Err(AgentError::InvalidConfig(format!(
                "proof_retry_budget={} exceeds the {} attempts supported by the proof engine",
                budget, supported
            ))),
            _ => Ok(()),
        }
    }

    fn apply_filter(
        &self,
        conjectures: Vec<ConjectureCandidate>,
        metrics: &mut CycleMetrics,
    ) -> Vec<ConjectureCandidate> {
        let mut survivors = Vec::with_capacity(conjectures.len());
        for conjecture in conjectures {
            let decision = self.filter.evaluate(&conjecture);
            if decision.accepted {
                survivors.push(conjecture);
            } else {
                tracing::debug!(gap = %conjecture.gap_missing_decl, reason = %decision.reason, "filtered out");
                *metrics.filter_reject_counts.entry(decision.reason).or_insert(0) += 1;
            }
        }
        metrics.filter_pass_count = survivors.len();
        metrics.filtered_out_count = metrics.conjecture_count - survivors.len();
        survivors
    }

    fn apply_novelty(
        &mut self,
        survivors: Vec<ConjectureCandidate>,
        metrics: &mut CycleMetrics,
    ) -> Vec<ConjectureCandidate> {
        let mut novel = Vec::with_capacity(survivors.len());
        for conjecture in survivors {
            let decision = self.novelty.is_novel(&conjecture.lean_statement);
            *metrics
                .novelty_reason_counts
                .entry(decision.reason.as_str().to_string())
                .or_insert(0) += 1;
            match decision.reason {
                NoveltyReason::Novel => novel.push(conjecture),
                NoveltyReason::Unknown => metrics.unknown_novelty_count += 1,
                _ => {
                    tracing::debug!(gap = %conjecture.gap_missing_decl, reason = decision.reason.as_str(), "duplicate");
                    metrics.duplicate_count += 1;
                }
            }
        }
        metrics.novel_count = novel.len();
        novel
    }

    fn attempt_proofs(
        &self,
        conjecture: &ConjectureCandidate,
        budget: usize,
        out: &mut impl Write,
        metrics: &mut CycleMetrics,
    ) -> Result<()> {
        let attempts = self.proof_engine.build_attempts(conjecture, budget)?;
        for attempt in attempts.iter().take(budget) {
            let clock = Instant::now();
            let result = self.verifier.verify(&attempt.statement, &attempt.proof_script);
            let record = AttemptRecord::new(&conjecture.gap_missing_decl, attempt, &result, elapsed_ms(clock));
            tracing::debug!(
                gap = %conjecture.gap_missing_decl,
                attempt = attempt.attempt_index,
                kind = record.failure_kind.as_str(),
                "proof attempt"
            );
            writeln!(out, "{}", to_sorted_json(&record)?)?;
            metrics.record_attempt(&record);
            if result.success {
                metrics.verification_success_count += 1;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapkit_runtime::{RuntimeStatus, VerificationMode, VerificationResult};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StaticVerifier {
        ready: bool,
        calls: Rc<RefCell<usize>>,
    }

    impl Verifier for StaticVerifier {
        fn is_available(&self) -> bool {
            self.ready
        }

        fn runtime_status(&self) -> RuntimeStatus {
            RuntimeStatus {
                lean_available: self.ready,
                sandbox_available: self.ready,
                runtime_ready: self.ready,
                verification_mode: VerificationMode::Sandboxed,
            }
        }

        fn verify(&self, statement: &str, proof_script: &str) -> VerificationResult {
            *self.calls.borrow_mut() += 1;
            VerificationResult {
                statement: statement.to_string(),
                proof_script: proof_script.to_string(),
                success: false,
                stderr: "error: unsolved goals".to_string(),
                timed_out: false,
            }
        }
    }

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let premises = dir.join("premises.txt");
        let decls = dir.join("decl_types.txt");
        fs::write(
            &premises,
            "Group.one_mul\n* Group.mul\n* Group.one\n---\nGroup.mul\n---\nGroup.one\n---\nRing.mul\n---\nRing.one\n",
        )
        .unwrap();
        fs::write(&decls, "theorem\nGroup.one_mul\n∀ {G : Type} [Group G] (a : G), 1 * a = a\n").unwrap();
        (premises, decls)
    }

    #[test]
    fn test_invalid_bounds_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (premises, decls) = write_inputs(dir.path());
        let out = dir.path().join("out");
        let cache = GraphCache::new(2);
        let calls = Rc::new(RefCell::new(0));
        let mut cycle = DiscoveryCycle::builder(&cache)
            .verifier(StaticVerifier { ready: true, calls })
            .build()
            .unwrap();

        for (top_k, budget) in [(0, 3), (5, 0)] {
            let config = CycleConfig {
                top_k,
                proof_retry_budget: budget,
                ..CycleConfig::new(&premises, &decls, &out)
            };
            assert!(matches!(cycle.run(&config), Err(AgentError::InvalidConfig(_))));
        }
        assert!(!out.exists());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_input_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GraphCache::new(2);
        let calls = Rc::new(RefCell::new(0));
        let mut cycle = DiscoveryCycle::builder(&cache)
            .verifier(StaticVerifier { ready: true, calls })
            .build()
            .unwrap();
        let missing = dir.path().join("absent_premises.txt");
        let config = CycleConfig::new(&missing, dir.path().join("decls.txt"), dir.path().join("out"));
        let err = cycle.run(&config).unwrap_err();
        assert!(err.to_string().contains("absent_premises.txt"));
    }

    #[test]
    fn test_retry_budget_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let (premises, decls) = write_inputs(dir.path());
        let cache = GraphCache::new(2);
        let calls = Rc::new(RefCell::new(0));
        let mut cycle = DiscoveryCycle::builder(&cache)
            .verifier(StaticVerifier {
                ready: true,
                calls: Rc::clone(&calls),
            })
            .build()
            .unwrap();
        let config = CycleConfig {
            proof_retry_budget: 2,
            ..CycleConfig::new(&premises, &decls, dir.path().join("out"))
        };

        let metrics = cycle.run(&config).unwrap();
        assert_eq!(metrics.gap_count, 1);
        assert_eq!(metrics.attempt_count, 2);
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(metrics.failure_counts[&crate::metrics::FailureKind::CompileError], 2);
        assert_eq!(metrics.verification_success_count, 0);
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[test]
    fn test_budget_beyond_engine_support_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (premises, decls) = write_inputs(dir.path());
        let out = dir.path().join("out");
        let cache = GraphCache::new(2);
        let calls = Rc::new(RefCell::new(0));
        let mut cycle = DiscoveryCycle::builder(&cache)
            .verifier(StaticVerifier {
                ready: true,
                calls: Rc::clone(&calls),
            })
            .build()
            .unwrap();
        let config = CycleConfig {
            proof_retry_budget: 4,
            ..CycleConfig::new(&premises, &decls, &out)
        };

        match cycle.run(&config) {
            Err(AgentError::InvalidConfig(message)) => assert!(message.contains("supported")),
            other => panic!("expected InvalidConfig, got {:?}", other.map(|m| m.attempt_count)),
        }
        assert!(!out.exists());
        assert!(cache.is_empty());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_default_verifier_runs_from_project_dir() {
        let cache = GraphCache::new(1);
        let builder = DiscoveryCycle::builder(&cache);
        let verifier = builder.default_verifier().unwrap();
        assert_eq!(
            verifier.runner().project_dir(),
            Some(Path::new(DEFAULT_LEAN_PROJECT_DIR))
        );

        let project = ProjectConfig {
            lean_project_dir: PathBuf::from("/srv/lean/Extract"),
            lean_timeout_secs: 7,
            ..ProjectConfig::default()
        };
        let verifier = DiscoveryCycle::builder(&cache)
            .project(&project)
            .default_verifier()
            .unwrap();
        assert_eq!(verifier.runner().project_dir(), Some(Path::new("/srv/lean/Extract")));
        assert_eq!(verifier.config().timeout, std::time::Duration::from_secs(7));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(CyclePhase::NoveltyChecked.to_string(), "novelty_checked");
        assert_eq!(CyclePhase::MetricsWritten.to_string(), "metrics_written");
    }
}
