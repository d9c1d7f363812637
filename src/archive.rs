//! Best-effort archive notifications.
//!
//! `ChallengeArchiver::track` only pushes the challenge onto a channel and
//! returns; a background worker delivers it to the archive endpoint and logs
//! the outcome. Nothing ever waits for an acknowledgement, and failures never
//! reach the player. Duplicate notifications are fine: the server dedupes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::domain::Challenge;
use crate::error::ClientError;
use crate::protocol::ChallengeWire;

/// Where archive notifications end up.
pub trait ArchiveSink: Send + Sync + 'static {
  fn record(&self, challenge: &ChallengeWire) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl ArchiveSink for ApiClient {
  async fn record(&self, challenge: &ChallengeWire) -> Result<(), ClientError> {
    self.track_challenge(challenge).await
  }
}

#[derive(Clone)]
pub struct ChallengeArchiver {
  tx: Option<mpsc::UnboundedSender<ChallengeWire>>,
}

/// Owns the worker task; `close` lets queued notifications drain.
pub struct ArchiveWorker {
  handle: JoinHandle<usize>,
}

impl ChallengeArchiver {
  /// Start the delivery worker on the current tokio runtime.
  pub fn spawn<K: ArchiveSink>(sink: K) -> (Self, ArchiveWorker) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ChallengeWire>();
    let handle = tokio::spawn(async move {
      let mut delivered = 0usize;
      while let Some(challenge) = rx.recv().await {
        match sink.record(&challenge).await {
          Ok(()) => {
            delivered += 1;
            debug!(target: "archive", theme = %challenge.theme, emotion = %challenge.emotion, "Challenge tracked");
          }
          Err(e) => warn!(target: "archive", theme = %challenge.theme, error = %e, "Failed to track challenge"),
        }
      }
      delivered
    });
    (Self { tx: Some(tx) }, ArchiveWorker { handle })
  }

  /// Archiver that drops every notification.
  pub fn disabled() -> Self {
    Self { tx: None }
  }

  /// Fire-and-forget.
  pub fn track(&self, challenge: &Challenge) {
    let Some(tx) = &self.tx else { return };
    if tx.send(ChallengeWire::from(challenge)).is_err() {
      warn!(target: "archive", "Archive worker is gone; dropping notification");
    }
  }
}

impl ArchiveWorker {
  /// Wait (bounded) for queued notifications once every archiver clone is dropped.
  /// Returns how many were delivered successfully.
  pub async fn close(self, grace: Duration) -> usize {
    match tokio::time::timeout(grace, self.handle).await {
      Ok(Ok(delivered)) => delivered,
      Ok(Err(e)) => {
        warn!(target: "archive", error = %e, "Archive worker ended abnormally");
        0
      }
      Err(_) => {
        info!(target: "archive", ?grace, "Archive worker still busy at shutdown; abandoning");
        0
      }
    }
  }
}
