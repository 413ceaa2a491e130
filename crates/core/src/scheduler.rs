//! The sequential build pipeline.
//!
//! One build is in flight at a time, so the shared sandbox environment is
//! never contended. Per target: reconcile the environment, `packer init`,
//! `packer build` with teed output, classify by exit status, persist the
//! outcome to the ledger and the log artifact, then notify.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::Result;
use crate::config::RunConfig;
use crate::error::CoreError;
use crate::ledger::{Ledger, Set};
use crate::notify::Notifier;
use crate::reconcile::{contains, reconcile};
use crate::runner::{run_captured, run_streamed};

/// Log files at or below this size are stubs from an interrupted run and do
/// not suppress a rebuild.
const SKIP_THRESHOLD_BYTES: u64 = 5;

/// Counters and the failed-target list for one pipeline run.
#[derive(Debug, Default)]
pub struct RunSummary {
  /// Targets whose build process actually ran.
  pub processed: usize,
  /// Targets skipped by exclusion or the resume rule.
  pub skipped: usize,
  /// Identifiers of targets whose build exited non-zero, in run order.
  pub failed: Vec<String>,
}

/// Run the full pipeline over the resolved target list.
///
/// Only an init failure aborts the run; build failures are recorded in the
/// ledger and the summary, and the loop continues. I/O trouble around a
/// single target is logged and skips only the affected step.
pub async fn run(config: &RunConfig) -> Result<RunSummary> {
  let targets = resolve_targets(config)?;
  let ledger = Ledger::new(&config.dir);
  let notifier = Notifier::new(config.notify_url.clone());
  let mut summary = RunSummary::default();

  for target in &targets {
    if contains(&config.exclude, target) {
      info!(target_file = %target, "excluded from build list, skipping");
      summary.skipped += 1;
      continue;
    }

    let log_path = config.dir.join(format!("{target}.log"));
    if already_built(&log_path) {
      info!(log = %log_path.display(), "log file already exists, skipping build");
      summary.skipped += 1;
      continue;
    }

    // Reset the sandbox before every attempt, not just the first, so state
    // never leaks between targets. Inherited quirk: on a listing or parse
    // error the build still proceeds against a possibly stale environment.
    if let Err(err) = reconcile(&config.tools, &config.destroy_instances).await {
      error!(error = %err, "environment reconcile failed");
    }

    init_target(config, target).await?;

    let succeeded = match build_target(config, target, &log_path).await {
      Ok(succeeded) => succeeded,
      Err(err) => {
        // No exit status means no classification; report and move on
        // rather than dropping the target silently.
        error!(target_file = %target, error = %err, "build could not be classified");
        continue;
      }
    };

    summary.processed += 1;
    record_outcome(&ledger, target, succeeded);
    if !succeeded {
      summary.failed.push(target.clone());
    }

    match tokio::fs::read_to_string(&log_path).await {
      Ok(text) => notifier.send(&text).await,
      Err(err) => error!(log = %log_path.display(), error = %err, "failed to read log for notification"),
    }
  }

  Ok(summary)
}

/// The explicit template list verbatim when given, otherwise a flat,
/// non-recursive glob for build definitions in the run directory.
fn resolve_targets(config: &RunConfig) -> Result<Vec<String>> {
  if !config.templates.is_empty() {
    return Ok(config.templates.clone());
  }

  let pattern = config.dir.join("*.hcl");
  let mut targets = Vec::new();
  for entry in glob::glob(&pattern.to_string_lossy())? {
    match entry {
      Ok(path) => {
        if let Some(name) = path.file_name() {
          targets.push(name.to_string_lossy().into_owned());
        }
      }
      Err(err) => warn!(error = %err, "unreadable path during discovery"),
    }
  }

  targets.sort();
  Ok(targets)
}

/// Resume rule: a log artifact with real content marks the target as built.
fn already_built(log_path: &Path) -> bool {
  match std::fs::metadata(log_path) {
    Ok(meta) => meta.len() > SKIP_THRESHOLD_BYTES,
    Err(_) => false,
  }
}

/// `packer init` for one target. Failure indicates a broken definition that
/// invalidates the whole batch and is fatal to the run.
async fn init_target(config: &RunConfig, target: &str) -> Result<()> {
  info!(target_file = %target, "running packer init");

  let output = run_captured(&config.tools.packer, &["init", target], &config.dir)
    .await
    .map_err(|err| CoreError::Spawn {
      program: config.tools.packer.clone(),
      source: err,
    })?;

  if output.status.success() {
    return Ok(());
  }

  Err(CoreError::Init {
    target: target.to_string(),
    detail: format!(
      "exit code {:?}: {}",
      output.status.code(),
      String::from_utf8_lossy(&output.stderr).trim()
    ),
  })
}

/// Run the build with teed output into a temp log, append the duration
/// footer and atomically relocate the log to its final path. Returns
/// whether the build process exited successfully.
async fn build_target(config: &RunConfig, target: &str, log_path: &Path) -> Result<bool> {
  let tmp_path = temp_log_path(log_path);
  let file = tokio::fs::File::create(&tmp_path).await?;
  let log = Arc::new(Mutex::new(file));

  info!(target_file = %target, "building");
  let started = Instant::now();
  let status = run_streamed(
    &config.tools.packer,
    &["build", "-color=false", target],
    &config.dir,
    log.clone(),
  )
  .await?;
  let duration = Duration::from_secs(started.elapsed().as_secs());

  let succeeded = status.success();
  let verdict = if succeeded { "success" } else { "failed" };
  info!(
    target_file = %target,
    duration = %humantime::format_duration(duration),
    verdict,
    "build finished"
  );

  {
    let mut file = log.lock().await;
    file
      .write_all(
        format!(
          "Build duration: {} ({verdict})\n",
          humantime::format_duration(duration)
        )
        .as_bytes(),
      )
      .await?;
    file.flush().await?;
  }

  // Relocate only after the process has fully exited and the footer is
  // flushed, so the skip check never reads a partial log.
  tokio::fs::rename(&tmp_path, log_path).await?;

  Ok(succeeded)
}

/// Persist the classification. A ledger I/O error is logged and skipped;
/// the run continues.
fn record_outcome(ledger: &Ledger, target: &str, succeeded: bool) {
  let result = if succeeded {
    ledger.transfer(Set::Failed, Set::Succeeded, target)
  } else {
    ledger.transfer(Set::Succeeded, Set::Failed, target)
  };

  if let Err(err) = result {
    error!(target_file = %target, error = %err, "failed to update ledger");
  }
}

/// Target-specific temp location beside the final log, so no two targets
/// collide and the final rename stays on one filesystem.
fn temp_log_path(log_path: &Path) -> PathBuf {
  let mut name = log_path.as_os_str().to_owned();
  name.push(".tmp");
  PathBuf::from(name)
}
