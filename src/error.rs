//! Error taxonomy shared by every client operation.
//!
//! Network failures, missing resources and server-side rejections are recoverable: the callers that own a
//! fallback path (challenge table, local guess, local scorer) catch them.
//! Everything else is surfaced to the player.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
  /// Transport failure, non-2xx status, or a body we could not decode.
  #[error("network error: {0}")]
  Network(String),

  /// 404 from the backend.
  #[error("not found: {0}")]
  NotFound(String),

  /// The server answered but with `success: false`.
  #[error("server rejected request: {0}")]
  Rejected(String),

  /// Missing token, or the server returned 401.
  #[error("not logged in: {0}")]
  Auth(String),

  /// Caught client-side, never sent to the server.
  #[error("{0}")]
  Validation(String),

  /// The submission gate refused today's daily submission.
  #[error("{reason}")]
  Ineligible { reason: String, previous_score: Option<f64> },

  #[error("local storage error: {0}")]
  Storage(String),
}

impl ClientError {
  /// True when a named fallback path may take over.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, ClientError::Network(_) | ClientError::NotFound(_) | ClientError::Rejected(_))
  }
}

impl From<reqwest::Error> for ClientError {
  fn from(e: reqwest::Error) -> Self {
    ClientError::Network(e.to_string())
  }
}

impl From<std::io::Error> for ClientError {
  fn from(e: std::io::Error) -> Self {
    ClientError::Storage(e.to_string())
  }
}
