//! bakeline-core: The build orchestration engine behind the `bakeline` CLI.
//!
//! For every Packer build definition in the working set, the scheduler
//! resets the incus sandbox, runs `packer init` and `packer build`, mirrors
//! the build output to the console and a per-target log file, records the
//! outcome in persistent success/failure ledgers and hands the log text to
//! a best-effort notification sink.

mod config;
mod error;
mod ledger;
mod notify;
mod reconcile;
mod runner;
mod scheduler;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{RunConfig, Tools};
pub use error::CoreError;
pub use ledger::{Ledger, Set};
pub use notify::Notifier;
pub use reconcile::{Instance, list_instances, reconcile};
pub use scheduler::{RunSummary, run};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
