// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 clang-bootstrap contributors

//! Run command - execute a pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::{Configuration, PipelineMode, Settings};
use crate::errors::RecoverySuggestion;
use crate::executors::{DryRunExecutor, ProcessExecutor, SystemExecutor};
use crate::pipeline::{
    layout, PipelineOrchestrator, PipelineReport, PipelineStep, StageResult, StepRecord, Topology,
    ToolSource,
};
use crate::tools::ToolResolver;
use crate::utils::{
    print_error, print_header, print_info, print_section, print_skipped, print_success,
    print_warning,
};

/// How the run was invoked, apart from pipeline settings
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub config_file: Option<PathBuf>,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
    pub verbose: bool,
}

/// Run a pipeline
pub async fn run(mode: PipelineMode, cli_settings: Settings, invocation: Invocation) -> Result<()> {
    let settings = Settings::load(invocation.config_file.as_deref())?.overlay(cli_settings);

    let resolver = if invocation.dry_run {
        ToolResolver::new().planning()
    } else {
        ToolResolver::new()
    };

    let config = Configuration::resolve(mode, settings, &resolver)?;

    print_plan(&config, invocation.verbose);

    let report = if invocation.dry_run {
        println!();
        println!("{}", "Dry run, commands that would run:".yellow());
        execute(&config, &DryRunExecutor::new(), &resolver).await
    } else {
        let executor = SystemExecutor::new()?;
        execute(&config, &executor, &resolver).await
    };

    print_summary(&report);

    if let Some(ref path) = invocation.report {
        write_report(path, &report)?;
    }

    if let Some(ref failure) = report.failure {
        let merged = layout::merged_profile(&config.build_root);
        let merged = (config.mode == PipelineMode::Pgo && merged.is_file()).then_some(merged);

        if let Some(suggestion) =
            RecoverySuggestion::for_failure(&failure.step, &failure.error, merged.as_deref())
        {
            eprintln!();
            eprint!("{}", suggestion);
        }
    }

    report.into_result()?;
    Ok(())
}

async fn execute(
    config: &Configuration,
    executor: &dyn ProcessExecutor,
    resolver: &ToolResolver,
) -> PipelineReport {
    PipelineOrchestrator::new(config, executor, resolver)
        .run()
        .await
}

fn print_plan(config: &Configuration, verbose: bool) {
    let topology = Topology::for_config(config);
    let selection = topology.select(&config.options);

    print_header(&format!("clang-bootstrap {} pipeline", config.mode));
    print_info(&format!("source:  {}", config.src_dir.display()));
    print_info(&format!("build:   {}", config.build_root.display()));
    print_info(&format!("install: {}", config.install_prefix.display()));

    print_section("Plan");
    for step in selection.steps() {
        match step {
            PipelineStep::Stage(stage) => {
                let compiler = match stage.compiler_source() {
                    Some(ToolSource::Bootstrap) => "bootstrap compiler".to_string(),
                    Some(ToolSource::DefaultToolchain) => "default clang".to_string(),
                    Some(ToolSource::BuildTree(from)) => format!("{} clang", from),
                    None => "no compiler".to_string(),
                };
                println!("  {} {}", stage.name.bold(), format!("({})", compiler).dimmed());
                if verbose {
                    println!("      {}", stage.working_dir.display().to_string().dimmed());
                }
            }
            PipelineStep::MergeProfiles(merge) => {
                println!(
                    "  {} {}",
                    merge.name.bold(),
                    format!("(→ {})", merge.output.display()).dimmed()
                );
            }
        }
    }
    for step in selection.skipped() {
        print_skipped(&format!("{} (skipped)", step.name()));
    }
    if selection.configure_only() {
        print_info("configure only");
    }
}

fn print_summary(report: &PipelineReport) {
    print_section("Summary");

    for record in &report.records {
        match record {
            StepRecord::Stage(outcome) => {
                let line = format!("{} ({:.1?})", outcome.stage, outcome.duration);
                match outcome.result {
                    StageResult::Success => print_success(&line),
                    StageResult::VerifyFailed { .. } if !outcome.result.is_fatal() => {
                        print_warning(&format!("{}, tests failed", line))
                    }
                    _ => print_error(&line),
                }
            }
            StepRecord::Merge {
                step,
                profile,
                duration,
            } => print_success(&format!(
                "{} ({} profiles, {:.1?})",
                step, profile.inputs, duration
            )),
        }
    }

    if let Some(ref failure) = report.failure {
        // Failures before a stage ran leave no record
        if !report.records.iter().any(|r| r.name() == failure.step) {
            print_error(&failure.step);
        }
    }

    println!();
    if report.success() {
        println!(
            "{} in {:.1?}",
            "Pipeline succeeded".green().bold(),
            report.duration
        );
    } else {
        println!(
            "{} in {:.1?}",
            "Pipeline failed".red().bold(),
            report.duration
        );
    }
}

fn write_report(path: &Path, report: &PipelineReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(crate::errors::BootstrapError::from)?;
    std::fs::write(path, json).map_err(|e| {
        miette::miette!("Failed to write report '{}': {}", path.display(), e)
    })?;
    Ok(())
}
