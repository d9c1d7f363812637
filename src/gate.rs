//! Daily submission gating. The server is the source of truth; every check
//! goes over the wire and nothing is cached between checks.

use std::future::Future;

use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::domain::{Denial, SubmissionEligibility};
use crate::error::ClientError;
use crate::protocol::{DailySubmitIn, DailySubmitOut, SubmissionStatusOut};

pub const LOGIN_REQUIRED: &str = "Please log in to submit daily challenges";
pub const STATUS_CHECK_FAILED: &str = "Error checking submission status";
const ALREADY_SUBMITTED: &str = "You have already submitted today's challenge";

/// Server side of the daily flow: eligibility checks and score persistence.
pub trait DailyService: Send + Sync {
  fn submission_status(&self, token: &str) -> impl Future<Output = Result<SubmissionStatusOut, ClientError>> + Send;
  fn submit_daily(&self, token: &str, body: &DailySubmitIn) -> impl Future<Output = Result<DailySubmitOut, ClientError>> + Send;
}

impl DailyService for ApiClient {
  async fn submission_status(&self, token: &str) -> Result<SubmissionStatusOut, ClientError> {
    ApiClient::submission_status(self, token).await
  }

  async fn submit_daily(&self, token: &str, body: &DailySubmitIn) -> Result<DailySubmitOut, ClientError> {
    ApiClient::submit_daily(self, token, body).await
  }
}

/// The daily badge.
#[derive(Clone, Debug, PartialEq)]
pub enum DailyStatus {
  Ready,
  Submitted { daily_score: Option<f64> },
  /// Not logged in, or the server could not be asked.
  Unavailable { reason: String },
}

pub struct SubmissionGate<D> {
  service: D,
}

impl<D: DailyService> SubmissionGate<D> {
  pub fn new(service: D) -> Self {
    Self { service }
  }

  pub fn service(&self) -> &D {
    &self.service
  }

  /// Never errors: a missing token, an auth failure, or an unreachable
  /// server all come back as `can_submit = false` with a reason.
  #[instrument(level = "info", skip(self, token), fields(logged_in = token.is_some()))]
  pub async fn check_eligibility(&self, token: Option<&str>) -> SubmissionEligibility {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
      return SubmissionEligibility::denied(Denial::NotLoggedIn, LOGIN_REQUIRED);
    };
    match self.service.submission_status(token).await {
      Ok(status) if status.can_submit => SubmissionEligibility::open(),
      Ok(status) => {
        let reason = status.message.or(status.error).unwrap_or_else(|| ALREADY_SUBMITTED.into());
        info!(target: "session", %reason, previous_score = ?status.daily_score, "Daily submission closed");
        SubmissionEligibility { previous_score: status.daily_score, ..SubmissionEligibility::denied(Denial::Server, reason) }
      }
      Err(ClientError::Auth(msg)) => {
        warn!(target: "session", reason = %msg, "Submission status refused the token");
        SubmissionEligibility::denied(Denial::NotLoggedIn, LOGIN_REQUIRED)
      }
      Err(e) => {
        warn!(target: "session", error = %e, "Submission status check failed");
        SubmissionEligibility::denied(Denial::Unreachable, STATUS_CHECK_FAILED)
      }
    }
  }

  pub async fn daily_status(&self, token: Option<&str>) -> DailyStatus {
    let e = self.check_eligibility(token).await;
    match e.denial {
      None => DailyStatus::Ready,
      Some(Denial::Server) => DailyStatus::Submitted { daily_score: e.previous_score },
      Some(Denial::NotLoggedIn | Denial::Unreachable) => {
        DailyStatus::Unavailable { reason: e.reason.unwrap_or_default() }
      }
    }
  }
}
