//! Best-effort delivery of build logs to an ntfy-style endpoint.

use tracing::{debug, warn};

/// Fire-and-forget notification sink.
///
/// The destination is an explicit configuration value; no URL means
/// delivery is disabled entirely. A delivery failure is logged and never
/// affects the build outcome.
#[derive(Debug, Clone)]
pub struct Notifier {
  url: Option<String>,
  client: reqwest::Client,
}

impl Notifier {
  pub fn new(url: Option<String>) -> Self {
    Self {
      url,
      client: reqwest::Client::new(),
    }
  }

  /// POST `message` as plain text to the configured channel.
  pub async fn send(&self, message: &str) {
    let Some(url) = &self.url else {
      debug!("no notification channel configured");
      return;
    };

    let result = self
      .client
      .post(url)
      .header("Content-Type", "text/plain")
      .body(message.to_string())
      .send()
      .await;

    match result {
      Ok(response) if response.status().is_success() => {
        debug!(url = %url, "notification delivered");
      }
      Ok(response) => {
        warn!(url = %url, status = %response.status(), "notification rejected");
      }
      Err(err) => {
        warn!(url = %url, error = %err, "failed to send notification");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn no_channel_is_a_no_op() {
    let notifier = Notifier::new(None);
    notifier.send("build log").await;
  }

  #[tokio::test]
  async fn posts_log_text_as_plain_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/builds")
      .match_header("content-type", "text/plain")
      .match_body("the full build log")
      .with_status(200)
      .create_async()
      .await;

    let notifier = Notifier::new(Some(format!("{}/builds", server.url())));
    notifier.send("the full build log").await;

    mock.assert_async().await;
  }

  #[tokio::test]
  async fn delivery_failure_does_not_panic() {
    // Nothing listens on this port.
    let notifier = Notifier::new(Some("http://127.0.0.1:9/unreachable".to_string()));
    notifier.send("build log").await;
  }

  #[tokio::test]
  async fn rejected_delivery_is_swallowed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/builds")
      .with_status(500)
      .create_async()
      .await;

    let notifier = Notifier::new(Some(format!("{}/builds", server.url())));
    notifier.send("build log").await;

    mock.assert_async().await;
  }
}
