// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Error recovery suggestions
//!
//! Tells the user how to pick a failed run back up without redoing the work
//! that already succeeded.

use std::path::Path;

use super::BootstrapError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest how to recover from a failure in `step`
    ///
    /// `merged_profile` is the merged profile path of a PGO run, if one
    /// exists on disk.
    pub fn for_failure(
        step: &str,
        error: &BootstrapError,
        merged_profile: Option<&Path>,
    ) -> Option<Self> {
        match error {
            BootstrapError::NoProfilesFound { dir } => Some(Self::rerun_training(dir)),
            BootstrapError::Interrupted { .. } => Some(Self::resume_after_interrupt(step, merged_profile)),
            BootstrapError::StageBuild { .. }
            | BootstrapError::StageVerify { .. }
            | BootstrapError::StagePackage { .. }
                if step == "pass2" =>
            {
                merged_profile.map(Self::resume_pass2)
            }
            BootstrapError::StageVerify { stage, .. } if stage == "stage2" => {
                Some(Self::skip_stage2_tests())
            }
            BootstrapError::ToolNotFound { tool, .. } => Some(Self::missing_tool(tool)),
            _ => None,
        }
    }

    /// Resume a PGO run at pass2 with an existing merged profile
    pub fn resume_pass2(profile: &Path) -> Self {
        Self {
            action: "Resume at pass2".into(),
            steps: vec![
                format!("A merged profile already exists at {}", profile.display()),
                "Fix the failure, then re-run pass2 alone; pass1 and the merge are skipped".into(),
            ],
            commands: vec!["clang-bootstrap pgo --skip-pass1 <same options>".into()],
        }
    }

    /// Make pass1 produce raw profiles
    pub fn rerun_training(dir: &Path) -> Self {
        Self {
            action: "Produce raw profiles".into(),
            steps: vec![
                format!("Nothing matching *.profraw was written to {}", dir.display()),
                "Profiles come from running the instrumented pass1 compiler".into(),
                "Don't pass --skip-test, or give --llvm-test-suite-path a workload".into(),
            ],
            commands: vec![format!("ls -la {}", dir.display())],
        }
    }

    fn resume_after_interrupt(step: &str, merged_profile: Option<&Path>) -> Self {
        match merged_profile {
            Some(profile) if step == "pass2" => Self::resume_pass2(profile),
            _ => Self {
                action: format!("Re-run to continue '{}'", step),
                steps: vec![
                    "Build directories were left in place".into(),
                    "Ninja picks up where it stopped".into(),
                ],
                commands: vec![],
            },
        }
    }

    fn skip_stage2_tests() -> Self {
        Self {
            action: "Inspect the stage2 test failures".into(),
            steps: vec![
                "stage2 built, but check-all failed".into(),
                "To install without tests, re-run with --skip-stage2-test".into(),
            ],
            commands: vec!["clang-bootstrap bootstrap --skip-stage2-test <same options>".into()],
        }
    }

    fn missing_tool(tool: &str) -> Self {
        Self {
            action: format!("Provide '{}'", tool),
            steps: vec![
                format!("'{}' could not be found where the stage expected it", tool),
                "Pass its location explicitly or add it to PATH".into(),
            ],
            commands: vec![format!("which {}", tool)],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
