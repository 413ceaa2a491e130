//! Sandbox environment teardown.
//!
//! Before every build attempt the scheduler brings the incus environment
//! back to a known-clean state by destroying the configured instance names.
//! Teardown against a live daemon is flaky (instances can be mid-transition)
//! so each destroy is wrapped in a bounded retry loop.

use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::Tools;
use crate::error::CoreError;
use crate::runner::run_captured;

const MAX_ATTEMPTS: u32 = 10;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// One sandbox instance as reported by the listing command.
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
  pub name: String,
}

/// List the currently running sandbox instances.
///
/// A spawn failure, non-zero exit or unparseable output is an error for
/// this call only; the caller treats it as non-fatal to the run.
pub async fn list_instances(tools: &Tools) -> Result<Vec<Instance>> {
  let output = run_captured(&tools.incus, &["ls", "--format=json"], Path::new("."))
    .await
    .map_err(|err| CoreError::Spawn {
      program: tools.incus.clone(),
      source: err,
    })?;

  if !output.status.success() {
    return Err(CoreError::ListInstances(format!(
      "'{} ls' exited with code {:?}",
      tools.incus,
      output.status.code()
    )));
  }

  let instances = serde_json::from_slice(&output.stdout)?;
  Ok(instances)
}

/// Destroy every listed instance whose trimmed name matches an entry of
/// `target_names`. Instances not in the list are left untouched.
///
/// Individual destroy failures are retried up to the attempt limit and
/// then reported and skipped; they never abort the reconcile.
pub async fn reconcile(tools: &Tools, target_names: &[String]) -> Result<()> {
  let instances = list_instances(tools).await?;

  for instance in &instances {
    if contains(target_names, &instance.name) {
      destroy_instance(tools, &instance.name).await;
    }
  }

  Ok(())
}

/// Trimmed-string membership test used for instance and target matching.
pub(crate) fn contains(haystack: &[String], needle: &str) -> bool {
  let needle = needle.trim();
  haystack.iter().any(|entry| entry.trim() == needle)
}

enum Probe {
  Exists,
  NotFound,
}

/// Probe-then-destroy cycle for one instance name, bounded retry.
async fn destroy_instance(tools: &Tools, name: &str) {
  for attempt in 1..=MAX_ATTEMPTS {
    match probe_instance(tools, name).await {
      Ok(Probe::NotFound) => {
        info!(instance = %name, "instance does not exist");
        return;
      }
      Ok(Probe::Exists) => {
        info!(instance = %name, "removing instance");
        match remove_instance(tools, name).await {
          Ok(()) => return,
          Err(err) => {
            warn!(instance = %name, attempt, error = %err, "failed to remove instance")
          }
        }
      }
      Err(err) => warn!(instance = %name, attempt, error = %err, "failed to check instance"),
    }

    if attempt < MAX_ATTEMPTS {
      debug!(instance = %name, delay = ?RETRY_DELAY, "retrying teardown");
      sleep(RETRY_DELAY).await;
    }
  }

  warn!(
    instance = %name,
    attempts = MAX_ATTEMPTS,
    "giving up on instance removal after retries"
  );
}

/// Check whether an instance exists. Exit code 1 from the listing means the
/// instance is already gone.
async fn probe_instance(tools: &Tools, name: &str) -> io::Result<Probe> {
  let output = run_captured(&tools.incus, &["ls", name], Path::new(".")).await?;

  if output.status.success() {
    Ok(Probe::Exists)
  } else if output.status.code() == Some(1) {
    Ok(Probe::NotFound)
  } else {
    Err(io::Error::other(format!(
      "probe exited with code {:?}: {}",
      output.status.code(),
      String::from_utf8_lossy(&output.stderr).trim()
    )))
  }
}

async fn remove_instance(tools: &Tools, name: &str) -> io::Result<()> {
  let output = run_captured(&tools.incus, &["rm", "--force", name], Path::new(".")).await?;

  if output.status.success() {
    Ok(())
  } else {
    Err(io::Error::other(format!(
      "destroy exited with code {:?}: {}",
      output.status.code(),
      String::from_utf8_lossy(&output.stderr).trim()
    )))
  }
}
