// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Configure and build command assembly

use std::fmt::Display;

use super::CommandSpec;
use crate::config::{Configuration, FlagChannel};
use crate::errors::BootstrapResult;
use crate::pipeline::{ConfigureRecipe, DefaultLinker, Stage, StepAction, ToolchainRecipe};
use crate::tools::{ToolRole, ToolSet};

const GENERATOR: &str = "-GNinja";

/// Assembles stage commands from the run configuration
pub struct CommandBuilder<'a> {
    config: &'a Configuration,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// The configure step for a stage
    pub fn configure(&self, stage: &Stage, tools: &ToolSet) -> BootstrapResult<CommandSpec> {
        match &stage.configure {
            ConfigureRecipe::Toolchain(recipe) => self.configure_toolchain(stage, recipe, tools),
            ConfigureRecipe::TestSuite { source } => {
                let cmake = tools.require(ToolRole::Configure, &stage.name)?;
                let cc = tools.require(ToolRole::CCompiler, &stage.name)?;
                let cxx = tools.require(ToolRole::CxxCompiler, &stage.name)?;

                Ok(CommandSpec::new(&cmake.path, &stage.working_dir)
                    .arg(GENERATOR)
                    .arg(define("CMAKE_BUILD_TYPE", self.build_type()))
                    .arg(define("CMAKE_C_COMPILER", cc.display()))
                    .arg(define("CMAKE_CXX_COMPILER", cxx.display()))
                    .arg("-S")
                    .arg(source.display().to_string())
                    .arg("-B")
                    .arg(stage.working_dir.display().to_string()))
            }
        }
    }

    /// A build, verify or package step for a stage
    pub fn step(
        &self,
        stage: &Stage,
        action: &StepAction,
        tools: &ToolSet,
    ) -> BootstrapResult<CommandSpec> {
        match action {
            StepAction::Targets { targets } => {
                let driver = tools.require(ToolRole::BuildDriver, &stage.name)?;
                Ok(CommandSpec::new(&driver.path, &stage.working_dir).args(targets.iter().cloned()))
            }
            StepAction::Tool { role, args } => {
                let tool = tools.require(*role, &stage.name)?;
                Ok(CommandSpec::new(&tool.path, &stage.working_dir).args(args.iter().cloned()))
            }
        }
    }

    fn build_type(&self) -> &'static str {
        if self.config.options.debug {
            "Debug"
        } else {
            "Release"
        }
    }

    fn configure_toolchain(
        &self,
        stage: &Stage,
        recipe: &ToolchainRecipe,
        tools: &ToolSet,
    ) -> BootstrapResult<CommandSpec> {
        let config = self.config;
        let options = &config.options;
        let cmake = tools.require(ToolRole::Configure, &stage.name)?;
        let cc = tools.require(ToolRole::CCompiler, &stage.name)?;

        let mut cmd = CommandSpec::new(&cmake.path, &stage.working_dir)
            .arg(GENERATOR)
            .arg(define("CMAKE_BUILD_TYPE", self.build_type()))
            .arg(define("CMAKE_INSTALL_PREFIX", config.install_prefix.display()))
            .arg(define("LLVM_ENABLE_ASSERTIONS", "On"))
            .arg(define("CMAKE_C_COMPILER", cc.display()));

        if let Some(cxx) = tools.get(ToolRole::CxxCompiler) {
            cmd = cmd.arg(define("CMAKE_CXX_COMPILER", cxx.display()));
        }
        if let Some(linker) = tools.get(ToolRole::Linker) {
            cmd = cmd.arg(define("LLVM_USE_LINKER", linker.display()));
        }

        cmd = cmd.arg(define("LLVM_ENABLE_PROJECTS", recipe.projects.join(";")));
        if !recipe.runtimes.is_empty() {
            cmd = cmd.arg(define("LLVM_ENABLE_RUNTIMES", recipe.runtimes.join(";")));
        }

        match recipe.default_linker {
            Some(DefaultLinker::Resolved) => {
                let linker = tools.require(ToolRole::Linker, &stage.name)?;
                cmd = cmd.arg(define("CLANG_DEFAULT_LINKER", linker.display()));
            }
            Some(DefaultLinker::Installed) => {
                let installed = config.install_prefix.join("bin").join("ld.lld");
                cmd = cmd.arg(define("CLANG_DEFAULT_LINKER", installed.display()));
            }
            None => {}
        }

        if let Some(lto) = recipe.lto.and_then(|l| l.cmake_value()) {
            cmd = cmd.arg(define("LLVM_ENABLE_LTO", lto));
        }

        if let Some(ref incdir) = options.binutils_include {
            cmd = cmd.arg(define("LLVM_BINUTILS_INCDIR", incdir.display()));
        }
        if options.use_newpm {
            cmd = cmd.arg(define("LLVM_USE_NEWPM", "On"));
        }
        if options.enable_libcxx {
            cmd = cmd.arg(define("LLVM_ENABLE_LIBCXX", "On"));
        }
        if options.static_cxx_stdlib {
            cmd = cmd.arg(define("LLVM_STATIC_LINK_CXX_STDLIB", "On"));
        }

        let compiler_flags = self.compiler_flags(recipe);
        if !compiler_flags.is_empty() {
            let flags = compiler_flags.join(" ");
            cmd = match recipe.compiler_flags {
                FlagChannel::Arg => cmd
                    .arg(define("CMAKE_C_FLAGS", &flags))
                    .arg(define("CMAKE_CXX_FLAGS", &flags)),
                FlagChannel::Env => cmd.env("CFLAGS", flags.clone()).env("CXXFLAGS", flags),
            };
        }

        if let Some(ref rpath) = recipe.rpath {
            let flags = format!("-Wl,-rpath={}", rpath.display());
            cmd = match recipe.linker_flags {
                FlagChannel::Arg => cmd.arg(define("CMAKE_EXE_LINKER_FLAGS", &flags)),
                FlagChannel::Env => cmd.env("LDFLAGS", flags),
            };
        }

        for (key, value) in &options.extra_defines {
            cmd = cmd.arg(define(key, value));
        }

        Ok(cmd.arg(config.src_dir.display().to_string()))
    }

    fn compiler_flags(&self, recipe: &ToolchainRecipe) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(ref dir) = recipe.profile_generate {
            flags.push(format!("-fprofile-generate={}", dir.display()));
        }
        if let Some(ref profile) = recipe.profile_use {
            flags.push(format!("-fprofile-use={}", profile.display()));
        }
        if self.config.options.native {
            flags.push("-march=native".to_string());
        }
        flags
    }
}

fn define(key: &str, value: impl Display) -> String {
    format!("-D{}={}", key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{fixtures, LtoMode, PipelineMode};
    use crate::pipeline::{resolve_tools, PipelineStep, Topology};
    use crate::tools::{ToolReference, ToolResolver};
    use std::path::Path;
    use tempfile::TempDir;

    fn stage(config: &Configuration, name: &str) -> Stage {
        Topology::for_config(config)
            .steps
            .into_iter()
            .find_map(|s| match s {
                PipelineStep::Stage(stage) if stage.name == name => Some(stage),
                _ => None,
            })
            .unwrap()
    }

    fn planned_tools(config: &Configuration, stage: &Stage) -> ToolSet {
        let resolver = ToolResolver::with_search_path("").planning();
        resolve_tools(&stage.tools, config, &resolver).unwrap()
    }

    #[test]
    fn test_bootstrap_stage1_baseline() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Bootstrap, temp.path());
        let stage1 = stage(&config, "stage1");
        let tools = planned_tools(&config, &stage1);

        let cmd = CommandBuilder::new(&config).configure(&stage1, &tools).unwrap();

        assert_eq!(cmd.program(), Path::new("/usr/bin/cmake"));
        assert_eq!(cmd.working_dir(), stage1.working_dir);
        assert!(cmd.has_arg("-GNinja"));
        assert_eq!(cmd.define("CMAKE_BUILD_TYPE"), Some("Release"));
        assert_eq!(cmd.define("LLVM_ENABLE_ASSERTIONS"), Some("On"));
        assert_eq!(cmd.define("LLVM_ENABLE_PROJECTS"), Some("clang"));
        assert_eq!(cmd.define("CMAKE_C_COMPILER"), Some("/usr/bin/gcc"));
        assert_eq!(cmd.define("LLVM_USE_LINKER"), None);
        assert_eq!(
            cmd.arguments().last().map(String::as_str),
            Some(config.src_dir.to_str().unwrap())
        );
        assert!(cmd.env_overlay().is_empty());
    }

    #[test]
    fn test_stage2_compiler_comes_from_stage1_build_tree() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Bootstrap, temp.path());
        let stage2 = stage(&config, "stage2");
        let tools = planned_tools(&config, &stage2);

        let cmd = CommandBuilder::new(&config).configure(&stage2, &tools).unwrap();
        let expected = config.stage_dir("stage1").join("bin").join("clang");
        assert_eq!(cmd.define("CMAKE_C_COMPILER"), expected.to_str());
    }

    #[test]
    fn test_default_mode_linker_and_options() {
        let temp = TempDir::new().unwrap();
        let mut config = fixtures::configuration(PipelineMode::Default, temp.path());
        config.options.debug = true;
        config.options.use_newpm = true;
        config.options.enable_libcxx = true;
        config.options.static_cxx_stdlib = true;
        config.options.binutils_include = Some("/usr/include".into());
        config.options.extra_defines = vec![("LLVM_TARGETS_TO_BUILD".into(), "X86".into())];
        let stage = stage(&config, "default");
        let tools = planned_tools(&config, &stage);

        let cmd = CommandBuilder::new(&config).configure(&stage, &tools).unwrap();

        assert_eq!(cmd.define("CMAKE_BUILD_TYPE"), Some("Debug"));
        assert_eq!(cmd.define("LLVM_USE_LINKER"), Some("/usr/bin/ld.lld"));
        let installed = config.install_prefix.join("bin").join("ld.lld");
        assert_eq!(cmd.define("CLANG_DEFAULT_LINKER"), installed.to_str());
        assert_eq!(
            cmd.define("LLVM_ENABLE_PROJECTS"),
            Some("clang;clang-tools-extra;compiler-rt;libcxx;libcxxabi;lld;mlir")
        );
        assert_eq!(cmd.define("LLVM_BINUTILS_INCDIR"), Some("/usr/include"));
        assert_eq!(cmd.define("LLVM_USE_NEWPM"), Some("On"));
        assert_eq!(cmd.define("LLVM_ENABLE_LIBCXX"), Some("On"));
        assert_eq!(cmd.define("LLVM_STATIC_LINK_CXX_STDLIB"), Some("On"));
        assert_eq!(cmd.define("LLVM_TARGETS_TO_BUILD"), Some("X86"));
    }

    #[test]
    fn test_pass1_instrumentation_flags_and_env_linker_flags() {
        let temp = TempDir::new().unwrap();
        let mut config = fixtures::configuration(PipelineMode::Pgo, temp.path());
        config.options.native = true;
        let pass1 = stage(&config, "pass1");
        let tools = planned_tools(&config, &pass1);

        let cmd = CommandBuilder::new(&config).configure(&pass1, &tools).unwrap();

        let profiles = config.build_root.join("pass1").join("profiles");
        let expected = format!("-fprofile-generate={} -march=native", profiles.display());
        assert_eq!(cmd.define("CMAKE_C_FLAGS"), Some(expected.as_str()));
        assert_eq!(cmd.define("CMAKE_CXX_FLAGS"), Some(expected.as_str()));
        assert_eq!(cmd.define("LLVM_ENABLE_RUNTIMES"), Some("compiler-rt"));
        assert_eq!(cmd.define("LLVM_ENABLE_LTO"), None);

        let default_clang = temp.path().join("clang-default");
        let lld = default_clang.join("bin").join("ld.lld");
        assert_eq!(cmd.define("CLANG_DEFAULT_LINKER"), lld.to_str());
        assert_eq!(
            cmd.env_overlay().get("LDFLAGS").map(String::as_str),
            Some(format!("-Wl,-rpath={}", default_clang.join("lib").display()).as_str())
        );
    }

    #[test]
    fn test_pass2_profile_use_and_lto() {
        let temp = TempDir::new().unwrap();
        let mut config = fixtures::configuration(PipelineMode::Pgo, temp.path());
        config.options.lto = LtoMode::Full;
        let pass2 = stage(&config, "pass2");
        let tools = planned_tools(&config, &pass2);

        let cmd = CommandBuilder::new(&config).configure(&pass2, &tools).unwrap();

        let merged = config.build_root.join("pass2").join("default.profdata");
        let expected = format!("-fprofile-use={}", merged.display());
        assert_eq!(cmd.define("CMAKE_C_FLAGS"), Some(expected.as_str()));
        assert_eq!(cmd.define("LLVM_ENABLE_LTO"), Some("Full"));
    }

    #[test]
    fn test_compiler_flags_via_environment_channel() {
        let temp = TempDir::new().unwrap();
        let mut config = fixtures::configuration(PipelineMode::Pgo, temp.path());
        config.options.compiler_flag_channel = FlagChannel::Env;
        let pass1 = stage(&config, "pass1");
        let tools = planned_tools(&config, &pass1);

        let cmd = CommandBuilder::new(&config).configure(&pass1, &tools).unwrap();

        assert_eq!(cmd.define("CMAKE_C_FLAGS"), None);
        assert!(cmd.env_overlay()["CFLAGS"].starts_with("-fprofile-generate="));
        assert_eq!(cmd.env_overlay()["CFLAGS"], cmd.env_overlay()["CXXFLAGS"]);
    }

    #[test]
    fn test_build_step_runs_driver_in_stage_dir() {
        let temp = TempDir::new().unwrap();
        let config = fixtures::configuration(PipelineMode::Pgo, temp.path());
        let pass2 = stage(&config, "pass2");
        let tools = planned_tools(&config, &pass2);
        let builder = CommandBuilder::new(&config);

        let build = builder.step(&pass2, &pass2.build, &tools).unwrap();
        assert_eq!(build.program(), Path::new("/usr/bin/ninja"));
        assert!(build.arguments().is_empty());
        assert_eq!(build.working_dir(), pass2.working_dir);

        let package = builder
            .step(&pass2, pass2.package.as_ref().unwrap(), &tools)
            .unwrap();
        assert_eq!(package.arguments(), ["package".to_string()]);
    }

    #[test]
    fn test_test_suite_configure_uses_pass1_compilers() {
        let temp = TempDir::new().unwrap();
        let mut config = fixtures::configuration(PipelineMode::Pgo, temp.path());
        config.options.llvm_test_suite_path = Some(temp.path().join("llvm-test-suite"));
        let suite = stage(&config, "test_suite");
        let mut tools = planned_tools(&config, &suite);
        tools.insert(ToolReference::new("/opt/pass1/bin/clang++", ToolRole::CxxCompiler));

        let cmd = CommandBuilder::new(&config).configure(&suite, &tools).unwrap();

        assert_eq!(cmd.define("CMAKE_CXX_COMPILER"), Some("/opt/pass1/bin/clang++"));
        assert!(cmd.has_arg("-S"));
        assert!(cmd.has_arg(temp.path().join("llvm-test-suite").to_str().unwrap()));
        assert_eq!(cmd.define("CMAKE_INSTALL_PREFIX"), None);
    }
}
