//! Error types for bakeline-core

use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Invalid discovery pattern: {0}")]
  Pattern(#[from] glob::PatternError),

  #[error("Failed to list instances: {0}")]
  ListInstances(String),

  #[error("Failed to parse instance listing: {0}")]
  ParseInstances(#[from] serde_json::Error),

  #[error("Failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("packer init failed for '{target}': {detail}")]
  Init { target: String, detail: String },
}
