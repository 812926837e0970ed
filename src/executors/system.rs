// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! System executor
//!
//! Spawns real child processes with inherited standard streams.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExecutionResult, InterruptSignal, ProcessExecutor};
use crate::command::CommandSpec;
use crate::errors::BootstrapError;

/// Runs commands as child processes of the orchestrator
pub struct SystemExecutor {
    interrupt: InterruptSignal,
}

impl SystemExecutor {
    /// Create a system executor listening for Ctrl-C
    pub fn new() -> Result<Self, BootstrapError> {
        Ok(Self::with_interrupt(InterruptSignal::ctrl_c()?))
    }

    /// Create a system executor stopped by `interrupt`
    pub fn with_interrupt(interrupt: InterruptSignal) -> Self {
        Self { interrupt }
    }
}

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn execute(&self, spec: CommandSpec) -> Result<ExecutionResult, BootstrapError> {
        if self.interrupt.is_raised() {
            warn!(program = %spec.program().display(), "interrupted, not starting");
            return Ok(ExecutionResult::interrupted(Duration::ZERO));
        }

        debug!(command = %spec, cwd = %spec.working_dir().display(), "spawning");

        let start = Instant::now();

        // envs() merges over the inherited environment
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.arguments())
            .current_dir(spec.working_dir())
            .envs(spec.env_overlay())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| BootstrapError::SpawnFailed {
            program: spec.program().display().to_string(),
            error: e.to_string(),
        })?;

        let waited = tokio::select! {
            biased;
            _ = self.interrupt.raised() => None,
            status = child.wait() => Some(status),
        };

        match waited {
            Some(status) => {
                let status = status?;
                // The terminal sends SIGINT to the child too; it may exit first
                if self.interrupt.is_raised() || killed_by_interrupt(&status) {
                    warn!(program = %spec.program().display(), "child stopped by interrupt");
                    return Ok(ExecutionResult::interrupted(start.elapsed()));
                }
                // Killed by another signal: no code, report as failure
                let exit_code = status.code().unwrap_or(-1);
                Ok(ExecutionResult::exited(exit_code, start.elapsed()))
            }
            None => {
                warn!(program = %spec.program().display(), "interrupted, stopping child process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill child process");
                }
                Ok(ExecutionResult::interrupted(start.elapsed()))
            }
        }
    }
}

#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(tokio::signal::unix::SignalKind::interrupt().as_raw_value())
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
    false
}
