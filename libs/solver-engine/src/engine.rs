/// Isolated Executor - Per-Case Process Execution
///
/// **Core Responsibility:**
/// Run a harness artifact in its own OS process and capture the raw
/// outcome.
///
/// **Critical Architectural Boundary:**
/// - The executor knows HOW to execute (spawn, deadline, capture)
/// - The executor does NOT know scoring rules
/// - The executor does NOT interpret harness output
/// - Raw outcomes go to the evaluator to judge
///
/// **Isolation Model:**
/// One child process per test case, empty environment apart from PATH,
/// stdin closed, hard wall-clock deadline enforced from spawn to
/// completion. On timeout the child is killed; that kill is the only
/// cancellation mechanism in the system. No syscall filtering and no
/// container runtime: process isolation plus the screener is the whole
/// posture.

use anyhow::{bail, Result};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Guardrail against pathological payloads reaching the command line.
const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Raw result of one harness invocation. Produced once per
/// (solution, test case) pair and never mutated.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// True when the child ran to completion, whatever its exit status.
    /// A harness that exits non-zero after printing a well-formed error
    /// object still completed; false means the child never produced a
    /// usable result (spawn failure, wait failure, or killed on timeout).
    pub exit_ok: bool,
    pub runtime_ms: u64,
}

impl ExecutionOutcome {
    fn failed(stderr: String, runtime_ms: u64) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            timed_out: false,
            exit_ok: false,
            runtime_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolatedExecutor {
    python_bin: String,
    timeout: Duration,
}

impl IsolatedExecutor {
    pub fn new(python_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python_bin: python_bin.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the artifact once with the JSON payload as its single
    /// argument. One invocation, one outcome; retries are the caller's
    /// decision and none are made here. Errors are reserved for guardrail
    /// violations - execution-level failures come back as outcomes.
    pub async fn execute(&self, artifact: &Path, payload: &Value) -> Result<ExecutionOutcome> {
        let payload_text = serde_json::to_string(payload)?;
        if payload_text.len() > MAX_PAYLOAD_BYTES {
            bail!(
                "Test payload exceeds maximum size of {} bytes",
                MAX_PAYLOAD_BYTES
            );
        }

        // PATH survives env_clear so the interpreter itself resolves
        let path_env = std::env::var("PATH")
            .unwrap_or_else(|_| "/usr/bin:/usr/local/bin:/bin".to_string());

        let start = Instant::now();
        let child = match Command::new(&self.python_bin)
            .arg(artifact)
            .arg(&payload_text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .env("PATH", &path_env)
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, python_bin = %self.python_bin, "failed to spawn interpreter");
                return Ok(ExecutionOutcome::failed(
                    format!("Failed to spawn interpreter: {}", e),
                    start.elapsed().as_millis() as u64,
                ));
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let runtime_ms = start.elapsed().as_millis() as u64;
                debug!(
                    runtime_ms = runtime_ms,
                    exit_status = ?output.status.code(),
                    "harness process completed"
                );
                Ok(ExecutionOutcome {
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    timed_out: false,
                    exit_ok: true,
                    runtime_ms,
                })
            }
            Ok(Err(e)) => Ok(ExecutionOutcome::failed(
                format!("Process error: {}", e),
                start.elapsed().as_millis() as u64,
            )),
            Err(_) => {
                // timeout: the child is dropped here and kill_on_drop
                // delivers SIGKILL
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "execution timed out, killing child"
                );
                Ok(ExecutionOutcome {
                    stdout: String::new(),
                    stderr: format!("Timeout after {}s", self.timeout.as_secs()),
                    timed_out: true,
                    exit_ok: false,
                    runtime_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}
