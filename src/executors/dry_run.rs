// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Dry-run executor
//!
//! Prints what would run and reports success without spawning anything.

use async_trait::async_trait;
use colored::Colorize;
use std::sync::Mutex;
use std::time::Duration;

use super::{ExecutionResult, ProcessExecutor};
use crate::command::CommandSpec;
use crate::errors::BootstrapError;

/// Executor that only records and prints commands
#[derive(Default)]
pub struct DryRunExecutor {
    commands: Mutex<Vec<CommandSpec>>,
    quiet: bool,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record commands without printing them
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// Commands seen so far, in order
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessExecutor for DryRunExecutor {
    async fn execute(&self, spec: CommandSpec) -> Result<ExecutionResult, BootstrapError> {
        if !self.quiet {
            println!(
                "    {} {}",
                format!("(cd {})", spec.working_dir().display()).dimmed(),
                spec
            );
        }

        if let Ok(mut commands) = self.commands.lock() {
            commands.push(spec);
        }

        Ok(ExecutionResult::exited(0, Duration::ZERO))
    }
}
