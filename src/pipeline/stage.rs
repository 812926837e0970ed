// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Stage definitions
//!
//! A [`Stage`] is plain data: where it runs, which tools it consumes and
//! from where, how it is configured, and which targets its build, verify and
//! package steps drive. The [`StageRunner`](super::StageRunner) interprets it.

use serde::Serialize;
use std::path::PathBuf;

use crate::config::{Configuration, FlagChannel, LtoMode};
use crate::errors::BootstrapResult;
use crate::tools::{ToolReference, ToolResolver, ToolRole, ToolSet};

/// Where a stage gets one of its tools from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "stage")]
pub enum ToolSource {
    /// The configured bootstrap tool for this role
    Bootstrap,
    /// `<default_clang>/bin`
    DefaultToolchain,
    /// `<build_root>/<stage>/bin` of an earlier stage's build tree
    BuildTree(String),
}

/// A tool a stage consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRequirement {
    pub role: ToolRole,
    pub name: &'static str,
    pub source: ToolSource,
}

impl ToolRequirement {
    pub fn new(role: ToolRole, name: &'static str, source: ToolSource) -> Self {
        Self { role, name, source }
    }

    /// Resolve this requirement against the run's configuration
    pub fn resolve(
        &self,
        config: &Configuration,
        resolver: &ToolResolver,
    ) -> BootstrapResult<ToolReference> {
        match &self.source {
            ToolSource::Bootstrap => config
                .bootstrap
                .for_role(self.role)
                .cloned()
                .map_or_else(|| resolver.resolve(None, self.name, self.role), Ok),
            ToolSource::DefaultToolchain => {
                let root = config.bootstrap.default_toolchain.as_deref();
                match root {
                    Some(root) => resolver.resolve(Some(root), self.name, self.role),
                    None => resolver.resolve(None, self.name, self.role),
                }
            }
            ToolSource::BuildTree(stage) => {
                resolver.resolve(Some(&config.stage_dir(stage)), self.name, self.role)
            }
        }
    }
}

/// Resolve every requirement of a stage, once, at stage entry
pub fn resolve_tools(
    requirements: &[ToolRequirement],
    config: &Configuration,
    resolver: &ToolResolver,
) -> BootstrapResult<ToolSet> {
    let mut tools = ToolSet::new();
    tools.insert(config.cmake.clone());
    tools.insert(config.ninja.clone());
    for requirement in requirements {
        tools.insert(requirement.resolve(config, resolver)?);
    }
    Ok(tools)
}

/// Where `CLANG_DEFAULT_LINKER` points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultLinker {
    /// The stage's resolved linker
    Resolved,
    /// `<install_prefix>/bin/ld.lld`
    Installed,
}

/// Configure recipe for an LLVM toolchain build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainRecipe {
    pub projects: Vec<String>,
    pub runtimes: Vec<String>,
    pub default_linker: Option<DefaultLinker>,
    pub lto: Option<LtoMode>,
    /// `-fprofile-generate=<dir>`
    pub profile_generate: Option<PathBuf>,
    /// `-fprofile-use=<file>`; must not be read before the merge step finished
    pub profile_use: Option<PathBuf>,
    /// `-Wl,-rpath=<dir>`
    pub rpath: Option<PathBuf>,
    pub compiler_flags: FlagChannel,
    pub linker_flags: FlagChannel,
}

impl ToolchainRecipe {
    pub fn new(projects: &[&str]) -> Self {
        Self {
            projects: projects.iter().map(|p| p.to_string()).collect(),
            runtimes: Vec::new(),
            default_linker: None,
            lto: None,
            profile_generate: None,
            profile_use: None,
            rpath: None,
            compiler_flags: FlagChannel::Arg,
            linker_flags: FlagChannel::Env,
        }
    }
}

/// How a stage's configure step is composed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ConfigureRecipe {
    /// Configure the LLVM source tree
    Toolchain(ToolchainRecipe),
    /// Configure an external test suite with this stage's compilers
    TestSuite { source: PathBuf },
}

/// A build, verify or package action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum StepAction {
    /// Run the build driver over these targets (empty = default target)
    Targets { targets: Vec<String> },
    /// Run a resolved tool with these arguments
    Tool { role: ToolRole, args: Vec<String> },
}

impl StepAction {
    pub fn default_target() -> Self {
        Self::Targets { targets: vec![] }
    }

    pub fn target(name: &str) -> Self {
        Self::Targets {
            targets: vec![name.to_string()],
        }
    }
}

/// What a failing verify step means for the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyPolicy {
    /// Abort the pipeline
    Fatal,
    /// Log a warning and carry on
    Soft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyStep {
    pub action: StepAction,
    pub policy: VerifyPolicy,
}

/// One configure + build (+ verify) (+ package) cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub name: String,
    pub working_dir: PathBuf,
    pub tools: Vec<ToolRequirement>,
    pub configure: ConfigureRecipe,
    pub build: StepAction,
    pub verify: Option<VerifyStep>,
    pub package: Option<StepAction>,
}

impl Stage {
    /// Source of the C compiler, used when reporting the plan
    pub fn compiler_source(&self) -> Option<&ToolSource> {
        self.tools
            .iter()
            .find(|t| t.role == ToolRole::CCompiler)
            .map(|t| &t.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{fixtures, PipelineMode};
    use crate::tools::fake_executable;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_source_uses_configured_tool() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Bootstrap, temp.path());
        let resolver = ToolResolver::with_search_path("");

        let cc = ToolRequirement::new(ToolRole::CCompiler, "gcc", ToolSource::Bootstrap)
            .resolve(&config, &resolver)
            .unwrap();
        assert_eq!(cc.path, PathBuf::from("/usr/bin/gcc"));
    }

    #[test]
    fn test_build_tree_source_resolves_against_stage_dir() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Bootstrap, temp.path());
        let clang = fake_executable(&config.stage_dir("stage1").join("bin"), "clang");
        let resolver = ToolResolver::with_search_path("");

        let cc = ToolRequirement::new(
            ToolRole::CCompiler,
            "clang",
            ToolSource::BuildTree("stage1".into()),
        )
        .resolve(&config, &resolver)
        .unwrap();
        assert_eq!(cc.path, clang);
    }

    #[test]
    fn test_resolve_tools_always_includes_cmake_and_ninja() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Default, temp.path());
        let resolver = ToolResolver::with_search_path("");

        let tools = resolve_tools(&[], &config, &resolver).unwrap();
        assert!(tools.get(ToolRole::Configure).is_some());
        assert!(tools.get(ToolRole::BuildDriver).is_some());
    }
}
