//! Sandboxed Lean verification of candidate proofs.
//!
//! `verify` runs its gates in order and spawns no process until all pass:
//! toolchain availability, the content denylist, the input allow-list and
//! sandbox resolution.

use std::fs;
use std::path::Path;
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};
use crate::runner::{CommandRunner, LeanRunner};

/// Every security rejection message starts with this marker.
pub const REJECTION_PREFIX: &str = "Rejected:";

pub const LEAN_UNAVAILABLE_MESSAGE: &str = "Lean executable is not available on PATH.";

pub const TRUNCATION_MARKER: &str = "...[truncated]";

const SCRATCH_PLACEHOLDER: &str = "<scratch>";
const SCRATCH_PREFIX: &str = "gapkit_lean_";
const SCRATCH_FILE: &str = "Candidate.lean";

/// Directives that can reach IO, the elaborator or foreign code.
pub const DENYLIST: &[&str] = &[
    "run_cmd",
    "run_tac",
    "run_elab",
    "#eval",
    "#exit",
    "IO.",
    "unsafe",
    "System.",
    "@[extern",
    "@[implemented_by",
    "import",
    "Lean.Elab",
    "Lean.Meta",
    "macro",
    "syntax",
    "elab ",
];

/// Tactics accepted by the allow-listed proof grammar.
pub const ALLOWED_TACTICS: &[&str] = &[
    "trivial",
    "simp",
    "decide",
    "rfl",
    "aesop",
    "exact?",
    "exact True.intro",
    "constructor",
];

static DENYLIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = DENYLIST
        .iter()
        .map(|token| word_bounded(token))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .expect("denylist pattern is valid")
});

/// Escapes `token` and anchors each edge that is a word character, so that
/// `import` matches the keyword but not `important_lemma`.
fn word_bounded(token: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::new();
    if token.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(token));
    if token.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern
}

static STATEMENT_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:theorem|lemma)\s+[A-Za-z_][A-Za-z0-9_'.]*\s*:\s*True\s*$")
        .expect("statement shape pattern is valid")
});

static PROOF_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let tactic = ALLOWED_TACTICS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"^\s*by\s+(?:{t})(?:[ \t]*[;\n]\s*(?:{t}))*\s*$",
        t = tactic
    ))
    .expect("proof shape pattern is valid")
});

/// Outcome of one verification call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub statement: String,
    pub proof_script: String,
    pub success: bool,
    pub stderr: String,
    pub timed_out: bool,
}

impl VerificationResult {
    fn failure(statement: &str, proof_script: &str, stderr: impl Into<String>) -> Self {
        Self {
            statement: statement.to_string(),
            proof_script: proof_script.to_string(),
            success: false,
            stderr: stderr.into(),
            timed_out: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Lean runs inside the configured sandbox command
    Sandboxed,
    /// Lean runs directly on the host; the operator accepted the risk
    TrustedLocal,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMode::Sandboxed => "sandboxed",
            VerificationMode::TrustedLocal => "trusted_local",
        }
    }
}

/// Readiness probe result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub lean_available: bool,
    pub sandbox_available: bool,
    /// `lean_available && (sandbox_available || trusted local mode)`
    pub runtime_ready: bool,
    pub verification_mode: VerificationMode,
}

impl RuntimeStatus {
    /// Human-readable reason the runtime is not ready.
    pub fn skipped_reason(&self) -> Option<String> {
        if self.runtime_ready {
            return None;
        }
        let reason = if !self.lean_available {
            "Lean toolchain is not available on PATH; verification skipped."
        } else {
            "Sandbox command is not available and trusted-local mode is off; verification skipped."
        };
        Some(reason.to_string())
    }
}

/// Verification capability consumed by the discovery cycle.
pub trait Verifier {
    fn is_available(&self) -> bool;
    fn runtime_status(&self) -> RuntimeStatus;
    fn verify(&self, statement: &str, proof_script: &str) -> VerificationResult;
}

/// Settings for [`SandboxedVerifier`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub lean_program: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Run Lean without a sandbox
    pub trusted_local_run: bool,
    /// Prefix prepended to the Lean command line
    pub sandbox_command: Vec<String>,
    /// Skip the allow-list; only honored when sandboxed
    pub allow_arbitrary_input: bool,
    pub max_stderr_chars: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            lean_program: "lean".to_string(),
            timeout: Duration::from_secs(30),
            trusted_local_run: false,
            sandbox_command: vec!["nsjail".to_string()],
            allow_arbitrary_input: false,
            max_stderr_chars: 4000,
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lean_program.trim().is_empty() {
            return Err(RuntimeError::InvalidConfig("lean_program must be set".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(RuntimeError::InvalidConfig("timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn mode(&self) -> VerificationMode {
        if self.trusted_local_run {
            VerificationMode::TrustedLocal
        } else {
            VerificationMode::Sandboxed
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Lean verifier that wraps the toolchain in a sandbox command.
pub struct SandboxedVerifier<R = LeanRunner> {
    config: VerifierConfig,
    runner: R,
    lean_available: OnceLock<bool>,
}

impl SandboxedVerifier<LeanRunner> {
    pub fn new(config: VerifierConfig) -> Result<Self> {
        Self::with_runner(config, LeanRunner::new())
    }
}

impl<R: CommandRunner> SandboxedVerifier<R> {
    pub fn with_runner(config: VerifierConfig, runner: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runner,
            lean_available: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn sandbox_available(&self) -> bool {
        self.config
            .sandbox_command
            .first()
            .is_some_and(|program| self.runner.program_available(program))
    }

    fn screen_input(&self, statement: &str, proof_script: &str) -> Option<String> {
        for text in [statement, proof_script] {
            if let Some(found) = DENYLIST_RE.find(text) {
                return Some(format!(
                    "{} unsafe input contains disallowed token '{}'.",
                    REJECTION_PREFIX,
                    found.as_str()
                ));
            }
        }

        let arbitrary_ok = self.config.allow_arbitrary_input && !self.config.trusted_local_run;
        if !arbitrary_ok
            && !(STATEMENT_SHAPE_RE.is_match(statement) && PROOF_SHAPE_RE.is_match(proof_script))
        {
            return Some(format!(
                "{} unsupported input shape; expected `theorem <name> : True` proved by an allow-listed tactic.",
                REJECTION_PREFIX
            ));
        }

        if !self.config.trusted_local_run && !self.sandbox_available() {
            let program = self
                .config
                .sandbox_command
                .first()
                .map(String::as_str)
                .unwrap_or("<none>");
            return Some(format!(
                "{} sandbox command '{}' could not be resolved on PATH.",
                REJECTION_PREFIX, program
            ));
        }

        None
    }

    fn command_line(&self, lean_file: &Path) -> Vec<String> {
        let mut argv = Vec::new();
        if !self.config.trusted_local_run {
            argv.extend(self.config.sandbox_command.iter().cloned());
        }
        argv.push(self.config.lean_program.clone());
        argv.push(lean_file.display().to_string());
        argv
    }

    fn run_in_scratch(&self, statement: &str, proof_script: &str) -> std::io::Result<VerificationResult> {
        let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        let lean_file = scratch.path().join(SCRATCH_FILE);
        fs::write(&lean_file, format!("{} :=\n{}\n", statement, proof_script))?;

        let argv = self.command_line(&lean_file);
        tracing::debug!(command = ?argv, "running lean");
        let output = self.runner.run(&argv, Some(scratch.path()), self.config.timeout);

        // lean reports elaboration errors on stdout
        let raw = if output.stderr.trim().is_empty() && !output.success() {
            output.stdout.as_str()
        } else {
            output.stderr.as_str()
        };
        let stderr = sanitize_stderr(raw, scratch.path(), self.config.max_stderr_chars);

        Ok(VerificationResult {
            statement: statement.to_string(),
            proof_script: proof_script.to_string(),
            success: output.success(),
            stderr,
            timed_out: output.timed_out,
        })
    }
}

impl<R: CommandRunner> Verifier for SandboxedVerifier<R> {
    fn is_available(&self) -> bool {
        *self.lean_available.get_or_init(|| {
            let program = &self.config.lean_program;
            let available =
                self.runner.program_available(program) && self.runner.version(program).is_some();
            tracing::info!(available, program = %program, "lean availability probed");
            available
        })
    }

    fn runtime_status(&self) -> RuntimeStatus {
        let lean_available = self.is_available();
        let sandbox_available = self.sandbox_available();
        RuntimeStatus {
            lean_available,
            sandbox_available,
            runtime_ready: lean_available && (sandbox_available || self.config.trusted_local_run),
            verification_mode: self.config.mode(),
        }
    }

    fn verify(&self, statement: &str, proof_script: &str) -> VerificationResult {
        if !self.is_available() {
            return VerificationResult::failure(statement, proof_script, LEAN_UNAVAILABLE_MESSAGE);
        }
        if let Some(reason) = self.screen_input(statement, proof_script) {
            tracing::warn!(%reason, "verification input rejected");
            return VerificationResult::failure(statement, proof_script, reason);
        }
        match self.run_in_scratch(statement, proof_script) {
            Ok(result) => result,
            Err(e) => VerificationResult::failure(
                statement,
                proof_script,
                format!("failed to prepare scratch file: {}", e),
            ),
        }
    }
}

/// Replaces the scratch directory path and bounds the length.
pub fn sanitize_stderr(stderr: &str, scratch_dir: &Path, max_chars: usize) -> String {
    let mut text = stderr.replace(&scratch_dir.display().to_string(), SCRATCH_PLACEHOLDER);
    if let Ok(resolved) = scratch_dir.canonicalize() {
        text = text.replace(&resolved.display().to_string(), SCRATCH_PLACEHOLDER);
    }
    if text.chars().count() > max_chars {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push_str(TRUNCATION_MARKER);
        return truncated;
    }
    text
}
