// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! clang-bootstrap - staged Clang/LLVM toolchain builds

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clang_bootstrap::cli::run::Invocation;
use clang_bootstrap::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "clang_bootstrap=debug"
    } else {
        "clang_bootstrap=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    clang_bootstrap::utils::init_colors();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let common = cli.command.common();
    let invocation = Invocation {
        config_file: cli.config.clone(),
        dry_run: common.dry_run,
        report: common.report.clone(),
        verbose: cli.verbose,
    };

    clang_bootstrap::cli::run::run(cli.command.mode(), cli.command.settings(), invocation).await
}
