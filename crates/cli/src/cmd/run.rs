//! Implementation of the `bakeline run` command.
//!
//! Maps the parsed flags onto a [`RunConfig`], drives the core pipeline on
//! a fresh runtime and prints the end-of-run summary.

use anyhow::{Context, Result};
use tracing::info;

use bakeline_core::{RunConfig, Tools, run};

/// Execute the run command.
///
/// For every resolved template, strictly in order: destroy the configured
/// instances, `packer init`, `packer build` with output captured to
/// `<template>.log`, record the outcome in the success/failure ledgers and
/// deliver the log to the notification channel. Prints the failed-template
/// list at the end.
pub fn cmd_run(
  destroy_instances: Vec<String>,
  exclude: Vec<String>,
  templates: Vec<String>,
  notify_url: Option<String>,
  strict: bool,
) -> Result<()> {
  let config = RunConfig {
    destroy_instances,
    exclude,
    templates,
    notify_url,
    strict,
    tools: Tools::default(),
    dir: std::env::current_dir().context("Failed to resolve current directory")?,
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let summary = rt.block_on(run(&config)).context("Run failed")?;

  info!(
    processed = summary.processed,
    skipped = summary.skipped,
    failed = summary.failed.len(),
    "run finished"
  );

  // Print summary
  println!();
  println!("Run complete!");
  println!("  Builds attempted: {}", summary.processed);
  println!("  Builds skipped: {}", summary.skipped);
  println!("  Builds failed: {}", summary.failed.len());

  if !summary.failed.is_empty() {
    println!();
    println!("Failed builds:");
    for target in &summary.failed {
      println!("  {target}");
    }

    if config.strict {
      anyhow::bail!("{} build(s) failed", summary.failed.len());
    }
  }

  Ok(())
}
