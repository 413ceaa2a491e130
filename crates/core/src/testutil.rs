//! Test utilities for bakeline-core.
//!
//! Helpers for tests that stand in stub shell scripts for the external
//! `incus` and `packer` tools and inspect the calls they received.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script named `name` into `dir` and return
/// its path.
#[cfg(unix)]
pub(crate) fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Read the invocation record a stub script appended to, one call per line.
pub(crate) fn recorded_calls(record: &Path) -> Vec<String> {
  match fs::read_to_string(record) {
    Ok(text) => text.lines().map(str::to_string).collect(),
    Err(_) => Vec::new(),
  }
}
