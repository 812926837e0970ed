// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Error types
//!
//! Every failure the orchestrator can hit, from a missing source tree to a
//! profile merge that exits nonzero, is a variant of [`BootstrapError`].
//! Variants carry a miette diagnostic code and, where there is something the
//! user can do about it, a help line.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for clang-bootstrap operations
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Main error type for clang-bootstrap
#[derive(Error, Debug, Diagnostic)]
pub enum BootstrapError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(clang_bootstrap::configuration))]
    Configuration {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read config file '{path}': {error}")]
    #[diagnostic(code(clang_bootstrap::config_file))]
    ConfigFile { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found in {searched}")]
    #[diagnostic(
        code(clang_bootstrap::tool_not_found),
        help("{suggestion}")
    )]
    ToolNotFound {
        tool: String,
        searched: String,
        suggestion: String,
    },

    #[error("Failed to launch '{program}': {error}")]
    #[diagnostic(code(clang_bootstrap::spawn_failed))]
    SpawnFailed { program: String, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configure step of stage '{stage}' exited with status {exit_code}")]
    #[diagnostic(code(clang_bootstrap::stage_configure))]
    StageConfigure { stage: String, exit_code: i32 },

    #[error("Build step of stage '{stage}' exited with status {exit_code}")]
    #[diagnostic(code(clang_bootstrap::stage_build))]
    StageBuild { stage: String, exit_code: i32 },

    #[error("Verify step of stage '{stage}' exited with status {exit_code}")]
    #[diagnostic(code(clang_bootstrap::stage_verify))]
    StageVerify { stage: String, exit_code: i32 },

    #[error("Package step of stage '{stage}' exited with status {exit_code}")]
    #[diagnostic(code(clang_bootstrap::stage_package))]
    StagePackage { stage: String, exit_code: i32 },

    #[error("Interrupted while running stage '{stage}'")]
    #[diagnostic(
        code(clang_bootstrap::interrupted),
        help("Partial build output was left in place; re-run to continue")
    )]
    Interrupted { stage: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Profile Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No raw profiles found in {dir}")]
    #[diagnostic(
        code(clang_bootstrap::no_profiles_found),
        help("The instrumented compiler writes *.profraw files when it runs; make sure pass1 ran its test workload")
    )]
    NoProfilesFound { dir: PathBuf },

    #[error("Profile merge into '{output}' exited with status {exit_code}")]
    #[diagnostic(code(clang_bootstrap::merge_failed))]
    MergeFailed { output: PathBuf, exit_code: i32 },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to create directory '{path}': {error}")]
    #[diagnostic(code(clang_bootstrap::create_dir))]
    CreateDir { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(clang_bootstrap::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(clang_bootstrap::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(clang_bootstrap::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(clang_bootstrap::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(clang_bootstrap::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for BootstrapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for BootstrapError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for BootstrapError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for BootstrapError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl BootstrapError {
    /// Create a tool not found error with a hint matching the tool
    pub fn tool_not_found(tool: &str, searched: impl Into<String>) -> Self {
        let suggestion = match tool {
            "cmake" => "Install CMake or pass --cmake-binary".to_string(),
            "ninja" => "Install Ninja or pass --ninja-binary".to_string(),
            "gcc" => "Install a host C compiler or pass --bootstrap-cc".to_string(),
            "clang" | "clang++" | "ld.lld" | "llvm-profdata" | "llvm-lit" => format!(
                "'{}' is produced by an LLVM build; check that the stage that provides it finished",
                tool
            ),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            searched: searched.into(),
            suggestion,
        }
    }

    /// Create a configuration error with an optional help line
    pub fn configuration(reason: impl Into<String>, help: Option<&str>) -> Self {
        Self::Configuration {
            reason: reason.into(),
            help: help.map(str::to_string),
        }
    }

    /// Whether this error was raised because the user interrupted the run
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
