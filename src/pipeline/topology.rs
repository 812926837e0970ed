// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Fixed pipeline topologies
//!
//! Each [`PipelineMode`] maps to one linear list of steps. Skipping and
//! resuming never edits that list: [`Topology::select`] picks an entry and an
//! exit index over it, so a resumed pipeline is a pure function of the list
//! and the options.

use serde::Serialize;
use std::path::PathBuf;

use super::layout::{self, MERGE, PASS1, PASS2, STAGE1, STAGE2, TEST_SUITE};
use super::stage::{
    ConfigureRecipe, DefaultLinker, Stage, StepAction, ToolRequirement, ToolSource,
    ToolchainRecipe, VerifyPolicy, VerifyStep,
};
use crate::config::{BuildOptions, Configuration, PipelineMode};
use crate::tools::ToolRole;

/// Projects enabled for full toolchain builds
pub const DEFAULT_PROJECTS: &[&str] = &[
    "clang",
    "clang-tools-extra",
    "compiler-rt",
    "libcxx",
    "libcxxabi",
    "lld",
    "mlir",
];

/// Projects enabled for minimal (bootstrap and training) builds
pub const MINIMAL_PROJECTS: &[&str] = &["clang"];

const CHECK_ALL: &str = "check-all";
const PACKAGE: &str = "package";

/// The profile merge step between pass1 and pass2
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStep {
    pub name: String,
    /// Flat directory holding the raw profiles
    pub profile_dir: PathBuf,
    pub extension: String,
    /// Where the merged profile is written
    pub output: PathBuf,
    pub tool: ToolRequirement,
}

/// One entry of a topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum PipelineStep {
    Stage(Stage),
    MergeProfiles(MergeStep),
}

impl PipelineStep {
    pub fn name(&self) -> &str {
        match self {
            Self::Stage(stage) => &stage.name,
            Self::MergeProfiles(merge) => &merge.name,
        }
    }
}

/// The fixed step list for a pipeline mode
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub mode: PipelineMode,
    pub steps: Vec<PipelineStep>,
}

/// The slice of a topology a run executes
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    topology: &'a Topology,
    entry: usize,
    exit: usize,
    configure_only: bool,
}

impl<'a> Selection<'a> {
    /// Steps that will run, in order
    pub fn steps(&self) -> &'a [PipelineStep] {
        &self.topology.steps[self.entry..=self.exit]
    }

    /// Steps of the topology left out of this run
    pub fn skipped(&self) -> impl Iterator<Item = &'a PipelineStep> + 'a {
        let (entry, exit) = (self.entry, self.exit);
        self.topology
            .steps
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i < entry || *i > exit)
            .map(|(_, step)| step)
    }

    /// Only the entry stage's configure step runs
    pub fn configure_only(&self) -> bool {
        self.configure_only
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.steps().iter().map(PipelineStep::name).collect()
    }
}

impl Topology {
    /// Build the topology for the configured mode
    pub fn for_config(config: &Configuration) -> Self {
        let steps = match config.mode {
            PipelineMode::Bootstrap => bootstrap_steps(config),
            PipelineMode::Default => default_steps(config),
            PipelineMode::Pgo => pgo_steps(config),
        };

        Self {
            mode: config.mode,
            steps,
        }
    }

    /// Pick entry and exit over the fixed step list
    pub fn select(&self, options: &BuildOptions) -> Selection<'_> {
        let last = self.steps.len().saturating_sub(1);

        let (entry, mut exit) = match self.mode {
            PipelineMode::Bootstrap if options.skip_stage2 => {
                (0, self.position(STAGE1).unwrap_or(0))
            }
            PipelineMode::Pgo if options.skip_pass1 => {
                (self.position(PASS2).unwrap_or(0), last)
            }
            _ => (0, last),
        };

        // Later stages need tools that a configure-only run never builds
        if options.config_only {
            exit = entry;
        }

        Selection {
            topology: self,
            entry,
            exit,
            configure_only: options.config_only,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name() == name)
    }
}

fn verify_step(skip: bool, policy: VerifyPolicy) -> Option<VerifyStep> {
    (!skip).then(|| VerifyStep {
        action: StepAction::target(CHECK_ALL),
        policy,
    })
}

fn bootstrap_steps(config: &Configuration) -> Vec<PipelineStep> {
    let options = &config.options;
    let mut recipe = ToolchainRecipe::new(MINIMAL_PROJECTS);
    recipe.compiler_flags = options.compiler_flag_channel;

    let stage1 = Stage {
        name: STAGE1.into(),
        working_dir: config.stage_dir(STAGE1),
        tools: vec![ToolRequirement::new(
            ToolRole::CCompiler,
            "gcc",
            ToolSource::Bootstrap,
        )],
        configure: ConfigureRecipe::Toolchain(recipe.clone()),
        build: StepAction::default_target(),
        verify: None,
        package: None,
    };

    // stage2 uses stage1's compiler straight from the build tree
    let stage2 = Stage {
        name: STAGE2.into(),
        working_dir: config.stage_dir(STAGE2),
        tools: vec![ToolRequirement::new(
            ToolRole::CCompiler,
            "clang",
            ToolSource::BuildTree(STAGE1.into()),
        )],
        configure: ConfigureRecipe::Toolchain(recipe),
        build: StepAction::default_target(),
        verify: verify_step(
            options.skip_test || options.skip_stage2_test,
            VerifyPolicy::Fatal,
        ),
        package: None,
    };

    vec![PipelineStep::Stage(stage1), PipelineStep::Stage(stage2)]
}

fn default_steps(config: &Configuration) -> Vec<PipelineStep> {
    let options = &config.options;
    let mut recipe = ToolchainRecipe::new(DEFAULT_PROJECTS);
    recipe.default_linker = Some(DefaultLinker::Installed);
    recipe.compiler_flags = options.compiler_flag_channel;

    let stage = Stage {
        name: layout::DEFAULT_STAGE.into(),
        working_dir: config.stage_dir(layout::DEFAULT_STAGE),
        tools: vec![
            ToolRequirement::new(ToolRole::CCompiler, "clang", ToolSource::Bootstrap),
            ToolRequirement::new(ToolRole::Linker, "ld.lld", ToolSource::Bootstrap),
        ],
        configure: ConfigureRecipe::Toolchain(recipe),
        build: StepAction::default_target(),
        verify: verify_step(options.skip_test, VerifyPolicy::Fatal),
        package: None,
    };

    vec![PipelineStep::Stage(stage)]
}

fn pgo_steps(config: &Configuration) -> Vec<PipelineStep> {
    let options = &config.options;
    let root = &config.build_root;
    let default_toolchain = config.bootstrap.default_toolchain.clone().unwrap_or_default();
    let mut steps = Vec::new();

    // pass1: instrumented clang built by the default toolchain
    let mut pass1 = ToolchainRecipe::new(MINIMAL_PROJECTS);
    pass1.runtimes = vec!["compiler-rt".into()];
    pass1.default_linker = Some(DefaultLinker::Resolved);
    pass1.profile_generate = Some(layout::raw_profile_dir(root));
    pass1.rpath = Some(default_toolchain.join("lib"));
    pass1.compiler_flags = options.compiler_flag_channel;

    // A test suite run replaces check-all as the training workload
    let pass1_verify = verify_step(
        options.skip_test || options.llvm_test_suite_path.is_some(),
        VerifyPolicy::Soft,
    );

    steps.push(PipelineStep::Stage(Stage {
        name: PASS1.into(),
        working_dir: config.stage_dir(PASS1),
        tools: vec![
            ToolRequirement::new(ToolRole::CCompiler, "clang", ToolSource::DefaultToolchain),
            ToolRequirement::new(ToolRole::Linker, "ld.lld", ToolSource::DefaultToolchain),
        ],
        configure: ConfigureRecipe::Toolchain(pass1),
        build: StepAction::default_target(),
        verify: pass1_verify,
        package: None,
    }));

    if let Some(ref suite) = options.llvm_test_suite_path {
        let suite_dir = config.stage_dir(TEST_SUITE);
        let pass1_tree = ToolSource::BuildTree(PASS1.into());
        steps.push(PipelineStep::Stage(Stage {
            name: TEST_SUITE.into(),
            working_dir: suite_dir.clone(),
            tools: vec![
                ToolRequirement::new(ToolRole::CCompiler, "clang", pass1_tree.clone()),
                ToolRequirement::new(ToolRole::CxxCompiler, "clang++", pass1_tree.clone()),
                ToolRequirement::new(ToolRole::TestRunner, "llvm-lit", pass1_tree),
            ],
            configure: ConfigureRecipe::TestSuite {
                source: suite.clone(),
            },
            build: StepAction::default_target(),
            verify: Some(VerifyStep {
                action: StepAction::Tool {
                    role: ToolRole::TestRunner,
                    args: vec![suite_dir.display().to_string()],
                },
                policy: VerifyPolicy::Fatal,
            }),
            package: None,
        }));
    }

    steps.push(PipelineStep::MergeProfiles(MergeStep {
        name: MERGE.into(),
        profile_dir: layout::raw_profile_dir(root),
        extension: layout::RAW_PROFILE_EXT.into(),
        output: layout::merged_profile(root),
        tool: ToolRequirement::new(
            ToolRole::ProfileMerge,
            "llvm-profdata",
            ToolSource::DefaultToolchain,
        ),
    }));

    // Resumed runs have no fresh pass1 tree to take tools from
    let pass2_source = if options.skip_pass1 {
        ToolSource::DefaultToolchain
    } else {
        ToolSource::BuildTree(PASS1.into())
    };

    let mut pass2 = ToolchainRecipe::new(DEFAULT_PROJECTS);
    pass2.lto = Some(options.lto);
    pass2.profile_use = Some(layout::merged_profile(root));
    pass2.rpath = Some(config.install_prefix.join("lib"));
    pass2.compiler_flags = options.compiler_flag_channel;

    steps.push(PipelineStep::Stage(Stage {
        name: PASS2.into(),
        working_dir: config.stage_dir(PASS2),
        tools: vec![
            ToolRequirement::new(ToolRole::CCompiler, "clang", pass2_source.clone()),
            ToolRequirement::new(ToolRole::Linker, "ld.lld", pass2_source),
        ],
        configure: ConfigureRecipe::Toolchain(pass2),
        build: StepAction::default_target(),
        verify: verify_step(options.skip_test, VerifyPolicy::Fatal),
        package: Some(StepAction::target(PACKAGE)),
    }));

    steps
}
