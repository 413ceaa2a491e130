//! Run configuration for the build pipeline.

use std::path::PathBuf;

/// Program names of the external tools the pipeline drives.
///
/// Kept as plain strings so tests can point them at stub scripts.
#[derive(Debug, Clone)]
pub struct Tools {
  /// Sandbox manager used to list and destroy instances.
  pub incus: String,
  /// Image builder invoked per build definition.
  pub packer: String,
}

impl Default for Tools {
  fn default() -> Self {
    Self {
      incus: "incus".to_string(),
      packer: "packer".to_string(),
    }
  }
}

/// Configuration for one pipeline run.
///
/// An explicit value handed to [`crate::run`], never process-wide state.
#[derive(Debug, Clone)]
pub struct RunConfig {
  /// Instance names destroyed before every build attempt.
  pub destroy_instances: Vec<String>,
  /// Build definitions excluded from the working set.
  pub exclude: Vec<String>,
  /// Explicit build definitions; overrides discovery when non-empty.
  pub templates: Vec<String>,
  /// Optional ntfy-style endpoint receiving each build log.
  pub notify_url: Option<String>,
  /// Exit non-zero when any build fails, not only on init failure.
  pub strict: bool,
  /// External tool program names.
  pub tools: Tools,
  /// Directory holding build definitions, logs and ledger files.
  pub dir: PathBuf,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      destroy_instances: Vec::new(),
      exclude: Vec::new(),
      templates: Vec::new(),
      notify_url: None,
      strict: false,
      tools: Tools::default(),
      dir: PathBuf::from("."),
    }
  }
}
