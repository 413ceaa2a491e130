//! External process execution with live output capture.
//!
//! The build runner mirrors the child's stdout and stderr to the parent
//! process streams while appending every byte to a shared log file. The two
//! copy tasks are explicitly joined before the exit status is returned, so
//! a caller classifying the build always sees a fully drained log.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Run a command to completion, capturing its output in memory.
///
/// Used for the quiet steps (probe, destroy, init) where only the exit
/// status matters and stderr is kept for diagnostics.
pub async fn run_captured(program: &str, args: &[&str], dir: &Path) -> io::Result<Output> {
  debug!(program = %program, ?args, "spawning process");
  Command::new(program)
    .args(args)
    .current_dir(dir)
    .stdin(Stdio::null())
    .output()
    .await
}

/// Run a command, teeing its stdout and stderr to the parent's own streams
/// and to `log`.
///
/// Exactly two copy tasks run concurrently with the process wait, one per
/// stream. A copy failure is logged and does not stop the sibling copy or
/// the wait.
pub async fn run_streamed(
  program: &str,
  args: &[&str],
  dir: &Path,
  log: Arc<Mutex<File>>,
) -> io::Result<ExitStatus> {
  debug!(program = %program, ?args, "spawning streamed process");
  let mut child = Command::new(program)
    .args(args)
    .current_dir(dir)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()?;

  let stdout = child
    .stdout
    .take()
    .ok_or_else(|| io::Error::other("child stdout was not piped"))?;
  let stderr = child
    .stderr
    .take()
    .ok_or_else(|| io::Error::other("child stderr was not piped"))?;

  let out_task = tokio::spawn(tee(stdout, tokio::io::stdout(), log.clone()));
  let err_task = tokio::spawn(tee(stderr, tokio::io::stderr(), log));

  let status = child.wait().await?;

  // Both streams must be drained before the caller classifies the build.
  for task in [out_task, err_task] {
    match task.await {
      Ok(Ok(())) => {}
      Ok(Err(err)) => warn!(error = %err, "output copy failed"),
      Err(err) => warn!(error = %err, "output copy task failed to complete"),
    }
  }

  Ok(status)
}

/// Copy `reader` to both `console` and the shared log file until EOF,
/// preserving byte order per stream.
async fn tee<R, W>(mut reader: R, mut console: W, log: Arc<Mutex<File>>) -> io::Result<()>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut buf = [0u8; 8192];
  loop {
    let n = reader.read(&mut buf).await?;
    if n == 0 {
      return Ok(());
    }
    console.write_all(&buf[..n]).await?;
    console.flush().await?;

    let mut log = log.lock().await;
    log.write_all(&buf[..n]).await?;
  }
}
