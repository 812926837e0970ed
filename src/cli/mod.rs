// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for clang-bootstrap. Every pipeline
//! option is also accepted from a config file; the flags here produce a
//! [`Settings`] value that is laid over the file's.

pub mod run;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{parse_define, FlagChannel, LtoMode, PipelineMode, Settings};

/// Staged Clang/LLVM toolchain builds
#[derive(Parser, Debug)]
#[clap(
    name = "clang-bootstrap",
    version,
    about = "Staged bootstrap and PGO+LTO build orchestrator for Clang/LLVM",
    long_about = None,
    after_help = "Examples:\n\
        clang-bootstrap bootstrap --install-prefix /opt/clang --src-dir llvm-project/llvm --build-dir build\n\
        clang-bootstrap pgo --default-clang /opt/clang ... --lto full\n\
        clang-bootstrap pgo ... --skip-pass1      Resume at pass2 with an existing profile\n\
        clang-bootstrap default ... --dry-run     Print the commands without running them\n\n\
        See 'clang-bootstrap <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Config file (TOML, or YAML by extension)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Two-stage bootstrap: stage1 with the host compiler, stage2 with stage1's clang
    Bootstrap {
        #[clap(flatten)]
        common: CommonArgs,

        /// Host C compiler for stage1 (default: gcc on PATH)
        #[clap(long, alias = "bootstrap_cc", value_name = "PATH")]
        bootstrap_cc: Option<PathBuf>,

        /// Stop after stage1
        #[clap(long, alias = "skip_stage2")]
        skip_stage2: bool,

        /// Build stage2 but don't run its tests
        #[clap(long, alias = "skip_stage2_test")]
        skip_stage2_test: bool,
    },

    /// Single-stage build with an existing clang and lld
    Default {
        #[clap(flatten)]
        common: CommonArgs,

        /// Clang to build with (default: clang on PATH)
        #[clap(long, alias = "bootstrap_clang", value_name = "PATH")]
        bootstrap_clang: Option<PathBuf>,

        /// lld to link with (default: ld.lld on PATH)
        #[clap(long, alias = "bootstrap_lld", value_name = "PATH")]
        bootstrap_lld: Option<PathBuf>,
    },

    /// Profile-guided build: instrumented pass1, profile merge, optimized pass2
    Pgo {
        #[clap(flatten)]
        common: CommonArgs,

        /// Install prefix of an existing clang (containing bin/clang)
        #[clap(long, alias = "default_clang", value_name = "DIR")]
        default_clang: Option<PathBuf>,

        /// Resume at pass2 using the merged profile of an earlier run
        #[clap(long, alias = "skip_pass1")]
        skip_pass1: bool,

        /// LTO for pass2 (thin, full, off)
        #[clap(long, value_name = "MODE")]
        lto: Option<LtoMode>,

        /// Build and run llvm-test-suite as the training workload
        #[clap(long, alias = "llvm_test_suite_path", value_name = "DIR")]
        llvm_test_suite_path: Option<PathBuf>,
    },
}

/// Options shared by every pipeline mode
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Install prefix for the built toolchain
    #[clap(long, alias = "install_prefix", value_name = "DIR")]
    pub install_prefix: Option<PathBuf>,

    /// The llvm/ directory of an llvm-project checkout
    #[clap(long, alias = "src_dir", value_name = "DIR")]
    pub src_dir: Option<PathBuf>,

    /// Build root; each stage gets a subdirectory
    #[clap(long, alias = "build_dir", value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// CMake to configure with (default: cmake on PATH)
    #[clap(long, alias = "cmake_binary", value_name = "PATH")]
    pub cmake_binary: Option<PathBuf>,

    /// Ninja to build with (default: ninja on PATH)
    #[clap(long, alias = "ninja_binary", value_name = "PATH")]
    pub ninja_binary: Option<PathBuf>,

    /// Skip every verify step
    #[clap(long, alias = "skip_test")]
    pub skip_test: bool,

    /// Only configure the first stage
    #[clap(long, alias = "config_only")]
    pub config_only: bool,

    /// Debug build type instead of Release
    #[clap(long)]
    pub debug: bool,

    /// Compile with -march=native
    #[clap(long)]
    pub native: bool,

    #[clap(long, alias = "use_newpm")]
    pub use_newpm: bool,

    #[clap(long, alias = "enable_libcxx")]
    pub enable_libcxx: bool,

    #[clap(long, alias = "static_cxx_stdlib")]
    pub static_cxx_stdlib: bool,

    /// LLVM_BINUTILS_INCDIR for the gold plugin
    #[clap(long, alias = "binutils_include", value_name = "DIR")]
    pub binutils_include: Option<PathBuf>,

    /// How compiler flags reach CMake (arg, env)
    #[clap(long, value_name = "CHANNEL")]
    pub compiler_flags: Option<FlagChannel>,

    /// Extra configure define, repeatable
    #[clap(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Print the commands instead of running them
    #[clap(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to this file
    #[clap(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl CommonArgs {
    /// Settings carried by these flags; unset flags leave file values alone
    fn settings(&self) -> Settings {
        Settings {
            install_prefix: self.install_prefix.clone(),
            src_dir: self.src_dir.clone(),
            build_dir: self.build_dir.clone(),
            cmake_binary: self.cmake_binary.clone(),
            ninja_binary: self.ninja_binary.clone(),
            skip_test: flag(self.skip_test),
            config_only: flag(self.config_only),
            debug: flag(self.debug),
            native: flag(self.native),
            use_newpm: flag(self.use_newpm),
            enable_libcxx: flag(self.enable_libcxx),
            static_cxx_stdlib: flag(self.static_cxx_stdlib),
            binutils_include: self.binutils_include.clone(),
            compiler_flag_channel: self.compiler_flags,
            defines: self.defines.iter().cloned().collect(),
            ..Settings::default()
        }
    }
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl Commands {
    pub fn mode(&self) -> PipelineMode {
        match self {
            Self::Bootstrap { .. } => PipelineMode::Bootstrap,
            Self::Default { .. } => PipelineMode::Default,
            Self::Pgo { .. } => PipelineMode::Pgo,
        }
    }

    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Bootstrap { common, .. } | Self::Default { common, .. } | Self::Pgo { common, .. } => {
                common
            }
        }
    }

    /// Settings from the command line alone
    pub fn settings(&self) -> Settings {
        let base = self.common().settings();
        match self {
            Self::Bootstrap {
                bootstrap_cc,
                skip_stage2,
                skip_stage2_test,
                ..
            } => Settings {
                bootstrap_cc: bootstrap_cc.clone(),
                skip_stage2: flag(*skip_stage2),
                skip_stage2_test: flag(*skip_stage2_test),
                ..base
            },
            Self::Default {
                bootstrap_clang,
                bootstrap_lld,
                ..
            } => Settings {
                bootstrap_clang: bootstrap_clang.clone(),
                bootstrap_lld: bootstrap_lld.clone(),
                ..base
            },
            Self::Pgo {
                default_clang,
                skip_pass1,
                lto,
                llvm_test_suite_path,
                ..
            } => Settings {
                default_clang: default_clang.clone(),
                skip_pass1: flag(*skip_pass1),
                lto: *lto,
                llvm_test_suite_path: llvm_test_suite_path.clone(),
                ..base
            },
        }
    }
}
