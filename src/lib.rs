// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! # clang-bootstrap - staged Clang/LLVM toolchain builds
//!
//! `clang-bootstrap` builds a Clang/LLVM toolchain in stages, where each stage
//! compiles the next with the compiler the previous stage produced.
//!
//! ## Pipelines
//!
//! - **bootstrap** - stage1 with the host compiler, stage2 with stage1's clang
//! - **default** - one stage with an existing clang and lld
//! - **pgo** - instrumented pass1, raw profile merge, then a PGO (+LTO) pass2
//!
//! ## Quick Start
//!
//! ```bash
//! # Two-stage bootstrap
//! clang-bootstrap bootstrap --install-prefix /opt/clang \
//!     --src-dir llvm-project/llvm --build-dir build
//!
//! # PGO build with full LTO, using an installed clang for pass1
//! clang-bootstrap pgo --default-clang /opt/clang ... --lto full
//!
//! # Resume a PGO build at pass2
//! clang-bootstrap pgo ... --skip-pass1
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod executors;
pub mod pipeline;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use command::{CommandBuilder, CommandSpec};
pub use config::{Configuration, PipelineMode, Settings};
pub use errors::{BootstrapError, BootstrapResult};
pub use executors::{ExecutionResult, ProcessExecutor};
pub use pipeline::{PipelineOrchestrator, PipelineReport, Stage, StageRunner};
pub use tools::{ToolReference, ToolResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
