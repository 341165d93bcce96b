//! Subprocess bridge to the Lean toolchain.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Default timeout for ad-hoc commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed or never started
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    fn failed_to_start(message: String) -> Self {
        Self {
            stderr: message,
            ..Self::default()
        }
    }
}

/// Process execution seam used by the verifier.
///
/// [`CommandRunner::run`] never fails: spawn errors and timeouts are
/// reported inside the returned [`CommandOutput`].
pub trait CommandRunner {
    /// Whether `program` resolves on `PATH` (or as a path).
    fn program_available(&self, program: &str) -> bool;

    /// First line of `program --version`, if it runs successfully.
    fn version(&self, program: &str) -> Option<String>;

    /// Runs `argv` to completion or until `timeout` expires.
    fn run(&self, argv: &[String], cwd: Option<&Path>, timeout: Duration) -> CommandOutput;
}

/// Runs real processes, killing them on timeout.
#[derive(Clone, Debug, Default)]
pub struct LeanRunner {
    project_dir: Option<PathBuf>,
}

impl LeanRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `dir` as the working directory when a run names none.
    pub fn with_project_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: Some(dir.into()),
        }
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }
}

impl CommandRunner for LeanRunner {
    fn program_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn version(&self, program: &str) -> Option<String> {
        if !self.program_available(program) {
            return None;
        }
        let argv = [program.to_string(), "--version".to_string()];
        let output = self.run(&argv, None, VERSION_PROBE_TIMEOUT);
        output
            .success()
            .then(|| output.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn run(&self, argv: &[String], cwd: Option<&Path>, timeout: Duration) -> CommandOutput {
        let Some((program, args)) = argv.split_first() else {
            return CommandOutput::failed_to_start("empty command".to_string());
        };
        let cwd = cwd.or(self.project_dir.as_deref());

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => return CommandOutput::failed_to_start(format!("runtime unavailable: {}", e)),
        };

        runtime.block_on(async {
            use tokio::process::Command;

            let mut command = Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = cwd {
                command.current_dir(dir);
            }

            let child = match command.spawn() {
                Ok(child) => child,
                Err(e) => return CommandOutput::failed_to_start(e.to_string()),
            };

            // dropping the child on timeout kills it
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                    timed_out: false,
                },
                Ok(Err(e)) => CommandOutput::failed_to_start(e.to_string()),
                Err(_) => CommandOutput {
                    stderr: format!("Command timed out after {:?}", timeout),
                    timed_out: true,
                    ..CommandOutput::default()
                },
            }
        })
    }
}
