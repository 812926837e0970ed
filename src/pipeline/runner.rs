// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Stage runner
//!
//! Drives one stage through its lifecycle:
//!
//! ```text
//! Pending → DirectoryEnsured → Configuring → Configured | ConfigureFailed
//!         → Building → Built | BuildFailed
//!         → [Verifying → Verified | VerifyFailed]
//!         → [Packaging → Packaged | PackageFailed]
//!         → Done
//! ```
//!
//! A soft verify failure still ends in `Done`.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::stage::{Stage, StepAction, VerifyPolicy};
use crate::command::CommandBuilder;
use crate::errors::{BootstrapError, BootstrapResult};
use crate::executors::{ExecutionResult, ProcessExecutor};
use crate::tools::ToolSet;

/// Lifecycle states of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageState {
    Pending,
    DirectoryEnsured,
    Configuring,
    Configured,
    ConfigureFailed,
    Building,
    Built,
    BuildFailed,
    Verifying,
    Verified,
    VerifyFailed,
    Packaging,
    Packaged,
    PackageFailed,
    Done,
}

/// How a failed verify step is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Soft,
    Hard,
}

/// Outcome of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "result")]
pub enum StageResult {
    Success,
    ConfigureFailed { exit_code: i32 },
    BuildFailed { exit_code: i32 },
    VerifyFailed { exit_code: i32, severity: Severity },
    PackageFailed { exit_code: i32 },
}

impl StageResult {
    /// Whether the pipeline must stop here
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Success => false,
            Self::VerifyFailed { severity, .. } => *severity == Severity::Hard,
            Self::ConfigureFailed { .. } | Self::BuildFailed { .. } | Self::PackageFailed { .. } => {
                true
            }
        }
    }

    /// The error this result stands for, if it is a failure
    pub fn to_error(&self, stage: &str) -> Option<BootstrapError> {
        let stage = stage.to_string();
        match *self {
            Self::Success => None,
            Self::ConfigureFailed { exit_code } => {
                Some(BootstrapError::StageConfigure { stage, exit_code })
            }
            Self::BuildFailed { exit_code } => Some(BootstrapError::StageBuild { stage, exit_code }),
            Self::VerifyFailed { exit_code, .. } => {
                Some(BootstrapError::StageVerify { stage, exit_code })
            }
            Self::PackageFailed { exit_code } => {
                Some(BootstrapError::StagePackage { stage, exit_code })
            }
        }
    }
}

/// Everything the orchestrator learns from running a stage
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: String,
    pub result: StageResult,
    /// States visited, in order
    pub trace: Vec<StageState>,
    pub duration: Duration,
}

impl StageOutcome {
    pub fn final_state(&self) -> StageState {
        self.trace.last().copied().unwrap_or(StageState::Pending)
    }
}

/// Runs one stage's configure, build, verify and package steps
pub struct StageRunner<'a> {
    executor: &'a dyn ProcessExecutor,
    builder: CommandBuilder<'a>,
}

struct Progress<'s> {
    stage: &'s str,
    trace: Vec<StageState>,
}

impl Progress<'_> {
    fn enter(&mut self, state: StageState) {
        debug!(stage = self.stage, state = ?state, "stage transition");
        self.trace.push(state);
    }
}

impl<'a> StageRunner<'a> {
    pub fn new(executor: &'a dyn ProcessExecutor, builder: CommandBuilder<'a>) -> Self {
        Self { executor, builder }
    }

    /// Run a stage with its already-resolved tools
    ///
    /// With `configure_only` the stage is done once configured. `Err` means
    /// a step could not be run at all or the user interrupted it.
    pub async fn run(
        &self,
        stage: &Stage,
        tools: &ToolSet,
        configure_only: bool,
    ) -> BootstrapResult<StageOutcome> {
        let start = Instant::now();
        let mut progress = Progress {
            stage: &stage.name,
            trace: vec![StageState::Pending],
        };

        let finish = |progress: Progress<'_>, result: StageResult| StageOutcome {
            stage: stage.name.clone(),
            result,
            trace: progress.trace,
            duration: start.elapsed(),
        };

        // Idempotent; an existing directory is fine
        tokio::fs::create_dir_all(&stage.working_dir)
            .await
            .map_err(|e| BootstrapError::CreateDir {
                path: stage.working_dir.clone(),
                error: e.to_string(),
            })?;
        progress.enter(StageState::DirectoryEnsured);

        progress.enter(StageState::Configuring);
        info!(stage = %stage.name, step = "configure", "running");
        let configure = self.builder.configure(stage, tools)?;
        let status = self.execute(stage, configure).await?;
        if !status.success() {
            progress.enter(StageState::ConfigureFailed);
            error!(stage = %stage.name, step = "configure", exit_code = status.exit_code, "step failed");
            return Ok(finish(progress, StageResult::ConfigureFailed { exit_code: status.exit_code }));
        }
        progress.enter(StageState::Configured);

        if configure_only {
            progress.enter(StageState::Done);
            return Ok(finish(progress, StageResult::Success));
        }

        progress.enter(StageState::Building);
        let status = self.run_action(stage, "build", &stage.build, tools).await?;
        if !status.success() {
            progress.enter(StageState::BuildFailed);
            error!(stage = %stage.name, step = "build", exit_code = status.exit_code, "step failed");
            return Ok(finish(progress, StageResult::BuildFailed { exit_code: status.exit_code }));
        }
        progress.enter(StageState::Built);

        let mut result = StageResult::Success;

        if let Some(ref verify) = stage.verify {
            progress.enter(StageState::Verifying);
            let status = self.run_action(stage, "verify", &verify.action, tools).await?;
            if status.success() {
                progress.enter(StageState::Verified);
            } else {
                progress.enter(StageState::VerifyFailed);
                match verify.policy {
                    VerifyPolicy::Fatal => {
                        error!(stage = %stage.name, step = "verify", exit_code = status.exit_code, "step failed");
                        return Ok(finish(
                            progress,
                            StageResult::VerifyFailed {
                                exit_code: status.exit_code,
                                severity: Severity::Hard,
                            },
                        ));
                    }
                    VerifyPolicy::Soft => {
                        warn!(
                            stage = %stage.name,
                            step = "verify",
                            exit_code = status.exit_code,
                            "step failed, continuing"
                        );
                        result = StageResult::VerifyFailed {
                            exit_code: status.exit_code,
                            severity: Severity::Soft,
                        };
                    }
                }
            }
        }

        if let Some(ref package) = stage.package {
            progress.enter(StageState::Packaging);
            let status = self.run_action(stage, "package", package, tools).await?;
            if !status.success() {
                progress.enter(StageState::PackageFailed);
                error!(stage = %stage.name, step = "package", exit_code = status.exit_code, "step failed");
                return Ok(finish(progress, StageResult::PackageFailed { exit_code: status.exit_code }));
            }
            progress.enter(StageState::Packaged);
        }

        progress.enter(StageState::Done);
        info!(stage = %stage.name, "stage done");
        Ok(finish(progress, result))
    }

    async fn run_action(
        &self,
        stage: &Stage,
        step: &str,
        action: &StepAction,
        tools: &ToolSet,
    ) -> BootstrapResult<ExecutionResult> {
        info!(stage = %stage.name, step, "running");
        let spec = self.builder.step(stage, action, tools)?;
        self.execute(stage, spec).await
    }

    async fn execute(
        &self,
        stage: &Stage,
        spec: crate::command::CommandSpec,
    ) -> BootstrapResult<ExecutionResult> {
        let status = self.executor.execute(spec).await?;
        if status.interrupted {
            return Err(BootstrapError::Interrupted {
                stage: stage.name.clone(),
            });
        }
        Ok(status)
    }
}
