// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Process executors
//!
//! This module provides the executor trait, the sole point where the
//! orchestrator touches the operating system's process layer, and its
//! implementations (system processes, dry runs).

mod dry_run;
mod interrupt;
mod system;

pub use dry_run::DryRunExecutor;
pub use interrupt::{InterruptSignal, InterruptTrigger};
pub use system::SystemExecutor;

use async_trait::async_trait;
use std::time::Duration;

use crate::command::CommandSpec;
use crate::errors::BootstrapError;

/// Exit status reported for a child killed because the user interrupted the run
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code (0 = success)
    pub exit_code: i32,

    /// The run was cut short by an interrupt
    pub interrupted: bool,

    /// Wall-clock duration
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a result from an exit code
    pub fn exited(exit_code: i32, duration: Duration) -> Self {
        Self {
            exit_code,
            interrupted: false,
            duration,
        }
    }

    /// Create a result for a child killed by an interrupt
    pub fn interrupted(duration: Duration) -> Self {
        Self {
            exit_code: INTERRUPTED_EXIT_CODE,
            interrupted: true,
            duration,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted
    }
}

/// Runs command specifications
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run a command to completion
    ///
    /// A nonzero exit is an `Ok` result; `Err` means the process could not
    /// be run at all. No retries.
    async fn execute(&self, spec: CommandSpec) -> Result<ExecutionResult, BootstrapError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted executor for pipeline tests

    use super::*;
    use std::sync::Mutex;

    type Rule = Box<dyn Fn(&CommandSpec) -> Option<ExecutionResult> + Send + Sync>;

    /// Records every command and answers with programmed results
    #[derive(Default)]
    pub struct ScriptedExecutor {
        rules: Vec<Rule>,
        calls: Mutex<Vec<CommandSpec>>,
        create_files: Vec<std::path::PathBuf>,
    }

    /// Whether `spec` runs in `dir` with an argument containing `needle`
    ///
    /// An empty needle matches a command with no arguments (the default
    /// build target).
    fn runs_in(spec: &CommandSpec, dir: &std::path::Path, needle: &str) -> bool {
        let matches_args = if needle.is_empty() {
            spec.arguments().is_empty()
        } else {
            spec.arguments().iter().any(|a| a.contains(needle))
        };
        spec.working_dir() == dir && matches_args
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commands in `dir` whose arguments contain `needle` exit with `code`
        ///
        /// The first matching rule wins.
        pub fn fail_in(mut self, dir: &std::path::Path, needle: &str, code: i32) -> Self {
            let dir = dir.to_path_buf();
            let needle = needle.to_string();
            self.rules.push(Box::new(move |spec: &CommandSpec| {
                runs_in(spec, &dir, &needle).then(|| ExecutionResult::exited(code, Duration::ZERO))
            }));
            self
        }

        /// Commands in `dir` whose arguments contain `needle` are interrupted
        pub fn interrupt_in(mut self, dir: &std::path::Path, needle: &str) -> Self {
            let dir = dir.to_path_buf();
            let needle = needle.to_string();
            self.rules.push(Box::new(move |spec: &CommandSpec| {
                runs_in(spec, &dir, &needle).then(|| ExecutionResult::interrupted(Duration::ZERO))
            }));
            self
        }

        /// Commands run by `program` exit with `code`
        pub fn fail_program(mut self, program: &str, code: i32) -> Self {
            let program = program.to_string();
            self.rules.push(Box::new(move |spec: &CommandSpec| {
                spec.program()
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy() == program)
                    .then(|| ExecutionResult::exited(code, Duration::ZERO))
            }));
            self
        }

        /// Write these files the first time any command runs
        pub fn creating(mut self, files: Vec<std::path::PathBuf>) -> Self {
            self.create_files = files;
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls whose working directory is `dir`
        pub fn calls_in(&self, dir: &std::path::Path) -> Vec<CommandSpec> {
            self.calls()
                .into_iter()
                .filter(|c| c.working_dir() == dir)
                .collect()
        }
    }

    #[async_trait]
    impl ProcessExecutor for ScriptedExecutor {
        async fn execute(&self, spec: CommandSpec) -> Result<ExecutionResult, BootstrapError> {
            for file in &self.create_files {
                if let Some(parent) = file.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if !file.exists() {
                    std::fs::write(file, b"profile")?;
                }
            }

            let result = self
                .rules
                .iter()
                .find_map(|rule| rule(&spec))
                .unwrap_or_else(|| ExecutionResult::exited(0, Duration::ZERO));
            self.calls.lock().unwrap().push(spec);
            Ok(result)
        }
    }
}
