//! Persistent success/failure bookkeeping.
//!
//! Two flat files, one trimmed target identifier per line. Removals rewrite
//! the file through a temp file in the same directory followed by a rename,
//! so a reader never observes a half-written set.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

pub const SUCCESS_FILE: &str = "success_list.txt";
pub const FAILURE_FILE: &str = "failure_list.txt";

/// The two outcome sets tracked across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Set {
  Succeeded,
  Failed,
}

/// The pair of persisted outcome sets.
///
/// Invariant: after [`Ledger::transfer`] commits, an identifier is a member
/// of at most one of the two sets.
#[derive(Debug, Clone)]
pub struct Ledger {
  success_path: PathBuf,
  failure_path: PathBuf,
}

impl Ledger {
  pub fn new(dir: &Path) -> Self {
    Self {
      success_path: dir.join(SUCCESS_FILE),
      failure_path: dir.join(FAILURE_FILE),
    }
  }

  fn path(&self, set: Set) -> &Path {
    match set {
      Set::Succeeded => &self.success_path,
      Set::Failed => &self.failure_path,
    }
  }

  /// Append `id` to `set` unless already present. Idempotent; creates the
  /// backing file on first use.
  pub fn add(&self, set: Set, id: &str) -> io::Result<()> {
    let path = self.path(set);
    let id = id.trim();

    if read_entries(path)?.iter().any(|entry| entry == id) {
      debug!(file = %path.display(), entry = %id, "entry already exists in file");
      return Ok(());
    }

    let mut file = fs::OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{id}")?;

    debug!(file = %path.display(), entry = %id, "added entry to file");
    Ok(())
  }

  /// Remove `id` from `set`, reporting whether it was present. An absent
  /// entry performs no write at all.
  pub fn remove(&self, set: Set, id: &str) -> io::Result<bool> {
    let path = self.path(set);
    let id = id.trim();

    let entries = read_entries(path)?;
    if !entries.iter().any(|entry| entry == id) {
      debug!(file = %path.display(), entry = %id, "entry not found, nothing to remove");
      return Ok(false);
    }

    let mut contents = String::new();
    for entry in entries.iter().filter(|entry| entry.as_str() != id) {
      contents.push_str(entry);
      contents.push('\n');
    }

    // Rename-based atomic rewrite; the temp file lives in the same
    // directory so the rename cannot cross filesystems.
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;

    debug!(file = %path.display(), entry = %id, "removed entry from file");
    Ok(true)
  }

  /// Move `id` from one set to the other. Safe to call when `id` was never
  /// in `from`; afterwards `id` is in `to` and not in `from`.
  pub fn transfer(&self, from: Set, to: Set, id: &str) -> io::Result<()> {
    if self.remove(from, id)? {
      debug!(entry = %id.trim(), "moved entry between outcome sets");
    }
    self.add(to, id)
  }

  /// Trimmed membership test against the persisted set.
  pub fn contains(&self, set: Set, id: &str) -> io::Result<bool> {
    let id = id.trim();
    Ok(read_entries(self.path(set))?.iter().any(|entry| entry == id))
  }

  /// All entries of a set, in file order.
  pub fn entries(&self, set: Set) -> io::Result<Vec<String>> {
    read_entries(self.path(set))
  }
}

fn read_entries(path: &Path) -> io::Result<Vec<String>> {
  match fs::read_to_string(path) {
    Ok(text) => Ok(
      text
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect(),
    ),
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(err) => Err(err),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn add_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Succeeded, "a.pkr.hcl").unwrap();
    ledger.add(Set::Succeeded, "a.pkr.hcl").unwrap();

    assert_eq!(ledger.entries(Set::Succeeded).unwrap(), vec!["a.pkr.hcl"]);
  }

  #[test]
  fn add_matches_trimmed_entries() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Failed, "a.pkr.hcl").unwrap();
    ledger.add(Set::Failed, "  a.pkr.hcl  ").unwrap();

    assert_eq!(ledger.entries(Set::Failed).unwrap(), vec!["a.pkr.hcl"]);
  }

  #[test]
  fn remove_absent_entry_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Succeeded, "a.pkr.hcl").unwrap();

    assert!(!ledger.remove(Set::Succeeded, "b.pkr.hcl").unwrap());
    assert_eq!(ledger.entries(Set::Succeeded).unwrap(), vec!["a.pkr.hcl"]);
  }

  #[test]
  fn remove_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    assert!(!ledger.remove(Set::Failed, "a.pkr.hcl").unwrap());
    assert!(!dir.path().join(FAILURE_FILE).exists());
  }

  #[test]
  fn remove_keeps_other_entries() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Succeeded, "a.pkr.hcl").unwrap();
    ledger.add(Set::Succeeded, "b.pkr.hcl").unwrap();
    ledger.add(Set::Succeeded, "c.pkr.hcl").unwrap();

    assert!(ledger.remove(Set::Succeeded, "b.pkr.hcl").unwrap());
    assert_eq!(
      ledger.entries(Set::Succeeded).unwrap(),
      vec!["a.pkr.hcl", "c.pkr.hcl"]
    );
  }

  #[test]
  fn transfer_moves_between_sets() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Failed, "a.pkr.hcl").unwrap();
    ledger.transfer(Set::Failed, Set::Succeeded, "a.pkr.hcl").unwrap();

    assert!(ledger.contains(Set::Succeeded, "a.pkr.hcl").unwrap());
    assert!(!ledger.contains(Set::Failed, "a.pkr.hcl").unwrap());
  }

  #[test]
  fn transfer_without_prior_membership() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.transfer(Set::Succeeded, Set::Failed, "a.pkr.hcl").unwrap();

    assert!(ledger.contains(Set::Failed, "a.pkr.hcl").unwrap());
    assert!(!ledger.contains(Set::Succeeded, "a.pkr.hcl").unwrap());
  }

  #[test]
  fn no_temp_file_left_behind() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::new(dir.path());

    ledger.add(Set::Succeeded, "a.pkr.hcl").unwrap();
    ledger.remove(Set::Succeeded, "a.pkr.hcl").unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|entry| entry.unwrap().file_name())
      .filter(|name| name.to_string_lossy().ends_with(".tmp"))
      .collect();
    assert!(leftovers.is_empty());
  }
}
