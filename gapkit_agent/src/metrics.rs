//! Cycle artifacts: per-attempt records and the cycle metrics document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gapkit_runtime::{VerificationMode, VerificationResult, REJECTION_PREFIX};
use serde::{Deserialize, Serialize};

use crate::proof::ProofAttempt;

/// Classification of one verification attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    None,
    Timeout,
    Unavailable,
    UnsafeInput,
    CompileError,
    VerificationFailed,
}

impl FailureKind {
    /// Every kind a failed attempt can have.
    pub const FAILURES: [FailureKind; 5] = [
        FailureKind::Timeout,
        FailureKind::Unavailable,
        FailureKind::UnsafeInput,
        FailureKind::CompileError,
        FailureKind::VerificationFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::None => "none",
            FailureKind::Timeout => "timeout",
            FailureKind::Unavailable => "unavailable",
            FailureKind::UnsafeInput => "unsafe_input",
            FailureKind::CompileError => "compile_error",
            FailureKind::VerificationFailed => "verification_failed",
        }
    }

    /// Timeout flag first, then the stderr text.
    pub fn classify(result: &VerificationResult) -> Self {
        if result.success {
            return FailureKind::None;
        }
        if result.timed_out {
            return FailureKind::Timeout;
        }
        let stderr = result.stderr.to_lowercase();
        if stderr.contains("not available") {
            FailureKind::Unavailable
        } else if result.stderr.starts_with(REJECTION_PREFIX) {
            FailureKind::UnsafeInput
        } else if stderr.contains("error") {
            FailureKind::CompileError
        } else {
            FailureKind::VerificationFailed
        }
    }
}

/// One line of `phase2_attempts.jsonl`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub gap_missing_decl: String,
    pub statement: String,
    pub proof_script: String,
    pub engine: String,
    pub attempt_index: usize,
    pub success: bool,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
    pub failure_kind: FailureKind,
}

impl AttemptRecord {
    pub fn new(
        gap_missing_decl: &str,
        attempt: &ProofAttempt,
        result: &VerificationResult,
        duration_ms: u64,
    ) -> Self {
        Self {
            gap_missing_decl: gap_missing_decl.to_string(),
            statement: attempt.statement.clone(),
            proof_script: attempt.proof_script.clone(),
            engine: attempt.engine.clone(),
            attempt_index: attempt.attempt_index,
            success: result.success,
            stderr: result.stderr.clone(),
            timed_out: result.timed_out,
            duration_ms,
            failure_kind: FailureKind::classify(result),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleArtifacts {
    pub gap_candidates_path: String,
    pub conjectures_path: String,
    pub attempts_path: String,
    pub metrics_path: String,
}

/// Contents of `phase2_cycle_metrics.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleMetrics {
    pub gap_count: usize,
    pub conjecture_count: usize,
    pub filter_pass_count: usize,
    pub filtered_out_count: usize,
    pub filter_reject_counts: BTreeMap<String, usize>,
    pub novel_count: usize,
    pub duplicate_count: usize,
    pub unknown_novelty_count: usize,
    pub novelty_reason_counts: BTreeMap<String, usize>,
    pub verifiable_count: usize,
    pub attempt_count: usize,
    pub verification_success_count: usize,
    /// Successes over generated conjectures
    pub success_rate: f64,
    /// Failed attempts by kind
    pub failure_counts: BTreeMap<FailureKind, usize>,
    pub graph_cache_hit: bool,
    pub cycle_duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub verifier_available: bool,
    pub sandbox_available: bool,
    pub runtime_ready: bool,
    pub verification_mode: VerificationMode,
    pub skipped_reason: Option<String>,
    pub top_k: usize,
    pub proof_retry_budget: usize,
    pub artifacts: CycleArtifacts,
}

impl CycleMetrics {
    pub fn new(started_at: DateTime<Utc>, top_k: usize, proof_retry_budget: usize) -> Self {
        Self {
            gap_count: 0,
            conjecture_count: 0,
            filter_pass_count: 0,
            filtered_out_count: 0,
            filter_reject_counts: BTreeMap::new(),
            novel_count: 0,
            duplicate_count: 0,
            unknown_novelty_count: 0,
            novelty_reason_counts: BTreeMap::new(),
            verifiable_count: 0,
            attempt_count: 0,
            verification_success_count: 0,
            success_rate: 0.0,
            failure_counts: FailureKind::FAILURES.iter().map(|kind| (*kind, 0)).collect(),
            graph_cache_hit: false,
            cycle_duration_ms: 0,
            started_at,
            verifier_available: false,
            sandbox_available: false,
            runtime_ready: false,
            verification_mode: VerificationMode::Sandboxed,
            skipped_reason: None,
            top_k,
            proof_retry_budget,
            artifacts: CycleArtifacts::default(),
        }
    }

    pub fn record_attempt(&mut self, record: &AttemptRecord) {
        self.attempt_count += 1;
        if record.failure_kind != FailureKind::None {
            *self.failure_counts.entry(record.failure_kind).or_insert(0) += 1;
        }
    }

    pub fn finish(&mut self, cycle_duration_ms: u64) {
        self.success_rate = if self.conjecture_count == 0 {
            0.0
        } else {
            self.verification_success_count as f64 / self.conjecture_count as f64
        };
        self.cycle_duration_ms = cycle_duration_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, stderr: &str, timed_out: bool) -> VerificationResult {
        VerificationResult {
            statement: "theorem t : True".to_string(),
            proof_script: "by trivial".to_string(),
            success,
            stderr: stderr.to_string(),
            timed_out,
        }
    }

    #[test]
    fn test_classify_order() {
        assert_eq!(FailureKind::classify(&result(true, "", false)), FailureKind::None);
        assert_eq!(
            FailureKind::classify(&result(false, "error: not available", true)),
            FailureKind::Timeout
        );
        assert_eq!(
            FailureKind::classify(&result(false, "Lean executable is not available on PATH.", false)),
            FailureKind::Unavailable
        );
        assert_eq!(
            FailureKind::classify(&result(false, "Rejected: unsupported input shape", false)),
            FailureKind::UnsafeInput
        );
        assert_eq!(
            FailureKind::classify(&result(false, "<scratch>/Candidate.lean:1:8: error: unknown", false)),
            FailureKind::CompileError
        );
        assert_eq!(
            FailureKind::classify(&result(false, "", false)),
            FailureKind::VerificationFailed
        );
    }

    #[test]
    fn test_failure_counts_preseeded() {
        let metrics = CycleMetrics::new(Utc::now(), 5, 3);
        let json = serde_json::to_value(&metrics).unwrap();
        let counts = json["failure_counts"].as_object().unwrap();
        assert_eq!(counts.len(), 5);
        assert!(!counts.contains_key("none"));
        assert_eq!(counts["compile_error"], 0);
        assert_eq!(json["verification_mode"], "sandboxed");
        assert!(json["skipped_reason"].is_null());
    }

    #[test]
    fn test_success_rate_over_conjectures() {
        let mut metrics = CycleMetrics::new(Utc::now(), 5, 3);
        metrics.conjecture_count = 4;
        metrics.verification_success_count = 1;
        metrics.finish(12);
        assert_eq!(metrics.success_rate, 0.25);
        assert_eq!(metrics.cycle_duration_ms, 12);
    }
}
