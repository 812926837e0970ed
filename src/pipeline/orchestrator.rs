// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Pipeline orchestrator
//!
//! Walks the selected slice of a topology in order. Tools for a stage are
//! resolved when the stage is entered, so a stage can use binaries an earlier
//! stage of the same run produced. The first fatal result stops the run.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::profile::{MergedProfile, ProfileAggregator};
use super::runner::{StageOutcome, StageResult, StageRunner};
use super::stage::resolve_tools;
use super::topology::{MergeStep, PipelineStep, Topology};
use crate::command::CommandBuilder;
use crate::config::{Configuration, PipelineMode};
use crate::errors::{BootstrapError, BootstrapResult};
use crate::executors::ProcessExecutor;
use crate::tools::ToolResolver;

/// Record of a step that ran
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum StepRecord {
    Stage(StageOutcome),
    Merge {
        step: String,
        profile: MergedProfile,
        duration: Duration,
    },
}

impl StepRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Stage(outcome) => &outcome.stage,
            Self::Merge { step, .. } => step,
        }
    }
}

/// Where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePhase {
    /// A tool the step needs could not be resolved
    Tools,
    /// The working directory could not be created or a process not launched
    Setup,
    Configure,
    Build,
    Verify,
    Package,
    Merge,
    Interrupted,
}

impl FailurePhase {
    /// The phase a failed stage stopped in; `None` for a success
    fn of_result(result: &StageResult) -> Option<Self> {
        match result {
            StageResult::ConfigureFailed { .. } => Some(Self::Configure),
            StageResult::BuildFailed { .. } => Some(Self::Build),
            StageResult::VerifyFailed { .. } => Some(Self::Verify),
            StageResult::PackageFailed { .. } => Some(Self::Package),
            StageResult::Success => None,
        }
    }

    fn of_error(error: &BootstrapError) -> Self {
        if error.is_interrupt() {
            return Self::Interrupted;
        }
        match error {
            BootstrapError::ToolNotFound { .. } => Self::Tools,
            BootstrapError::NoProfilesFound { .. } | BootstrapError::MergeFailed { .. } => {
                Self::Merge
            }
            _ => Self::Setup,
        }
    }
}

/// The fatal failure that ended a run
#[derive(Debug, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub phase: FailurePhase,
    pub message: String,
    #[serde(skip)]
    pub error: BootstrapError,
}

impl StepFailure {
    fn new(step: &str, phase: FailurePhase, error: BootstrapError) -> Self {
        Self {
            step: step.to_string(),
            phase,
            message: error.to_string(),
            error,
        }
    }
}

/// Everything that happened during a run
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub mode: PipelineMode,
    /// Steps that ran, in order
    pub records: Vec<StepRecord>,
    /// Steps of the topology left out by the selection
    pub skipped: Vec<String>,
    /// Non-fatal problems, such as a failed soft verify
    pub warnings: Vec<String>,
    pub failure: Option<StepFailure>,
    pub duration: Duration,
}

impl PipelineReport {
    fn new(mode: PipelineMode) -> Self {
        Self {
            mode,
            records: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            duration: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Names of the steps that ran
    pub fn step_names(&self) -> Vec<&str> {
        self.records.iter().map(StepRecord::name).collect()
    }

    /// Turn a failed report into its error
    pub fn into_result(self) -> BootstrapResult<Self> {
        match self.failure {
            Some(failure) => Err(failure.error),
            None => Ok(self),
        }
    }
}

/// Runs a configured pipeline end to end
pub struct PipelineOrchestrator<'a> {
    config: &'a Configuration,
    executor: &'a dyn ProcessExecutor,
    resolver: &'a ToolResolver,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        config: &'a Configuration,
        executor: &'a dyn ProcessExecutor,
        resolver: &'a ToolResolver,
    ) -> Self {
        Self {
            config,
            executor,
            resolver,
        }
    }

    /// Run every selected step and report what happened
    pub async fn run(&self) -> PipelineReport {
        let start = Instant::now();
        let topology = Topology::for_config(self.config);
        let selection = topology.select(&self.config.options);
        let mut report = PipelineReport::new(self.config.mode);

        report.skipped = selection
            .skipped()
            .map(|s| s.name().to_string())
            .collect();

        info!(
            mode = %self.config.mode,
            steps = ?selection.names(),
            skipped = ?report.skipped,
            "starting pipeline"
        );

        let runner = StageRunner::new(self.executor, CommandBuilder::new(self.config));
        let aggregator = ProfileAggregator::new(self.executor);

        for step in selection.steps() {
            let failure = match step {
                PipelineStep::Stage(stage) => {
                    self.run_stage(&runner, stage, selection.configure_only(), &mut report)
                        .await
                }
                PipelineStep::MergeProfiles(merge) => {
                    self.run_merge(&aggregator, merge, &mut report).await
                }
            };

            if let Some(failure) = failure {
                error!(step = %failure.step, phase = ?failure.phase, "pipeline stopped");
                report.failure = Some(failure);
                break;
            }
        }

        report.duration = start.elapsed();
        if report.success() {
            info!(duration = ?report.duration, "pipeline finished");
        }
        report
    }

    async fn run_stage(
        &self,
        runner: &StageRunner<'_>,
        stage: &super::stage::Stage,
        configure_only: bool,
        report: &mut PipelineReport,
    ) -> Option<StepFailure> {
        let tools = match resolve_tools(&stage.tools, self.config, self.resolver) {
            Ok(tools) => tools,
            Err(e) => return Some(StepFailure::new(&stage.name, FailurePhase::Tools, e)),
        };

        let outcome = match runner.run(stage, &tools, configure_only).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let phase = FailurePhase::of_error(&e);
                return Some(StepFailure::new(&stage.name, phase, e));
            }
        };

        let result = outcome.result;
        report.records.push(StepRecord::Stage(outcome));

        if result.is_fatal() {
            return FailurePhase::of_result(&result)
                .zip(result.to_error(&stage.name))
                .map(|(phase, e)| StepFailure::new(&stage.name, phase, e));
        }

        if let StageResult::VerifyFailed { exit_code, .. } = result {
            let message = format!(
                "verify step of stage '{}' exited with status {}; continuing",
                stage.name, exit_code
            );
            warn!("{}", message);
            report.warnings.push(message);
        }

        None
    }

    async fn run_merge(
        &self,
        aggregator: &ProfileAggregator<'_>,
        merge: &MergeStep,
        report: &mut PipelineReport,
    ) -> Option<StepFailure> {
        let start = Instant::now();

        let tool = match merge.tool.resolve(self.config, self.resolver) {
            Ok(tool) => tool,
            Err(e) => return Some(StepFailure::new(&merge.name, FailurePhase::Tools, e)),
        };

        match aggregator
            .aggregate(merge, &tool, self.resolver.is_planning())
            .await
        {
            Ok(profile) => {
                report.records.push(StepRecord::Merge {
                    step: merge.name.clone(),
                    profile,
                    duration: start.elapsed(),
                });
                None
            }
            Err(e) => {
                let phase = FailurePhase::of_error(&e);
                Some(StepFailure::new(&merge.name, phase, e))
            }
        }
    }
}
