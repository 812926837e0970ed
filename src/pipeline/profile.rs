// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Raw profile discovery and merging

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::topology::MergeStep;
use crate::command::CommandSpec;
use crate::errors::{BootstrapError, BootstrapResult};
use crate::executors::ProcessExecutor;
use crate::tools::ToolReference;

/// A set of raw profile files
///
/// Ordered by path, so the merge command is the same whatever order the
/// filesystem listed the files in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileSet {
    files: BTreeSet<PathBuf>,
}

impl ProfileSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }
}

impl FromIterator<PathBuf> for ProfileSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// A merged profile ready for `-fprofile-use`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedProfile {
    pub path: PathBuf,
    /// Number of raw profiles that went into it
    pub inputs: usize,
}

/// Collects raw profiles and merges them into one
pub struct ProfileAggregator<'a> {
    executor: &'a dyn ProcessExecutor,
}

impl<'a> ProfileAggregator<'a> {
    pub fn new(executor: &'a dyn ProcessExecutor) -> Self {
        Self { executor }
    }

    /// Find every `*.<extension>` file directly inside `dir`
    ///
    /// The directory is flat; subdirectories are not searched.
    pub fn discover(dir: &Path, extension: &str) -> BootstrapResult<ProfileSet> {
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            extension
        );

        let profiles: ProfileSet = glob::glob(&pattern)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();

        debug!(dir = %dir.display(), count = profiles.len(), "discovered raw profiles");

        if profiles.is_empty() {
            return Err(BootstrapError::NoProfilesFound {
                dir: dir.to_path_buf(),
            });
        }
        Ok(profiles)
    }

    /// The merge command for a profile set
    ///
    /// Runs next to the raw profiles, so nothing executes in the stage that
    /// consumes the output.
    pub fn merge_command(tool: &ToolReference, profiles: &ProfileSet, output: &Path) -> CommandSpec {
        let working_dir = profiles
            .iter()
            .next()
            .and_then(|p| p.parent())
            .or_else(|| output.parent())
            .unwrap_or(output);
        CommandSpec::new(&tool.path, working_dir)
            .arg("merge")
            .arg("-o")
            .arg(output.display().to_string())
            .args(profiles.iter().map(|p| p.display().to_string()))
    }

    /// Merge `profiles` into `output`
    pub async fn merge(
        &self,
        tool: &ToolReference,
        profiles: &ProfileSet,
        output: &Path,
    ) -> BootstrapResult<MergedProfile> {
        if profiles.is_empty() {
            let dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
            return Err(BootstrapError::NoProfilesFound { dir });
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BootstrapError::CreateDir {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        info!(inputs = profiles.len(), output = %output.display(), "merging profiles");
        let status = self
            .executor
            .execute(Self::merge_command(tool, profiles, output))
            .await?;

        if status.interrupted {
            return Err(BootstrapError::Interrupted {
                stage: super::layout::MERGE.to_string(),
            });
        }
        if !status.success() {
            return Err(BootstrapError::MergeFailed {
                output: output.to_path_buf(),
                exit_code: status.exit_code,
            });
        }

        Ok(MergedProfile {
            path: output.to_path_buf(),
            inputs: profiles.len(),
        })
    }

    /// Discover and merge in one go, as the merge step of a topology
    ///
    /// With `planning` set, a missing profile directory is not an error: the
    /// profiles do not exist yet when a dry run plans the merge.
    pub async fn aggregate(
        &self,
        step: &MergeStep,
        tool: &ToolReference,
        planning: bool,
    ) -> BootstrapResult<MergedProfile> {
        let profiles = match Self::discover(&step.profile_dir, &step.extension) {
            Ok(profiles) => profiles,
            Err(BootstrapError::NoProfilesFound { .. }) if planning => {
                let placeholder = step.profile_dir.join(format!("*.{}", step.extension));
                std::iter::once(placeholder).collect()
            }
            Err(e) => return Err(e),
        };
        self.merge(tool, &profiles, &step.output).await
    }
}
