// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Staged toolchain pipelines
//!
//! This module defines the fixed topologies (bootstrap, default, PGO), the
//! stage state machine that runs each stage, profile aggregation between the
//! PGO passes, and the orchestrator that ties them together.

pub mod layout;
mod orchestrator;
mod profile;
mod runner;
mod stage;
mod topology;

pub use orchestrator::{
    FailurePhase, PipelineOrchestrator, PipelineReport, StepFailure, StepRecord,
};
pub use profile::{MergedProfile, ProfileAggregator, ProfileSet};
pub use runner::{Severity, StageOutcome, StageResult, StageRunner, StageState};
pub use stage::{
    resolve_tools, ConfigureRecipe, DefaultLinker, Stage, StepAction, ToolRequirement,
    ToolSource, ToolchainRecipe, VerifyPolicy, VerifyStep,
};
pub use topology::{
    MergeStep, PipelineStep, Selection, Topology, DEFAULT_PROJECTS, MINIMAL_PROJECTS,
};
