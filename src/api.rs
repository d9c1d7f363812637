//! Minimal HTTP client for the Stanzle backend.
//!
//! One method per endpoint; every call is instrumented and logs endpoint,
//! status and latency (never poem bodies or full tokens). Transport failures
//! and non-2xx answers become `ClientError::Network`, 401 becomes
//! `ClientError::Auth`, 404 becomes `ClientError::NotFound`, and
//! `success: false` bodies become `ClientError::Rejected`.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

use crate::config::ClientConfig;
use crate::domain::{Guess, GuessOrigin, ScoreOrigin, ScoreResult, UserStats};
use crate::error::ClientError;
use crate::protocol::*;
use crate::util::{mask_token, trunc_for_log};

const CLIENT_AGENT: &str = "stanzle-client/0.1";

#[derive(Clone)]
pub struct ApiClient {
  pub client: reqwest::Client,
  pub base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
  #[serde(default)]
  error: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

/// Pull a human-readable reason out of a JSON error body, if there is one.
fn extract_error(body: &str) -> Option<String> {
  let parsed: ErrorBody = serde_json::from_str(body).ok()?;
  parsed.error.or(parsed.message).filter(|s| !s.trim().is_empty())
}

impl ApiClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  pub fn from_config(cfg: &ClientConfig) -> Result<Self, ClientError> {
    Self::new(cfg.api_base_url(), Duration::from_secs(cfg.request_timeout_secs))
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn get(&self, path: &str) -> RequestBuilder {
    self.client.get(self.url(path)).header(USER_AGENT, CLIENT_AGENT)
  }

  fn post(&self, path: &str) -> RequestBuilder {
    self.client
      .post(self.url(path))
      .header(USER_AGENT, CLIENT_AGENT)
      .header(CONTENT_TYPE, "application/json")
  }

  /// Bearer header plus the mirrored `authToken` cookie.
  fn authed(req: RequestBuilder, token: &str) -> RequestBuilder {
    req
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .header(COOKIE, format!("authToken={}", token))
  }

  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, endpoint: &'static str) -> Result<T, ClientError> {
    let start = Instant::now();
    let res = req.send().await.map_err(|e| {
      error!(target: "stanzle", endpoint, error = %e, "Request failed");
      ClientError::Network(e.to_string())
    })?;
    let status = res.status();
    let elapsed = start.elapsed();

    if status == StatusCode::UNAUTHORIZED {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_error(&body).unwrap_or_else(|| "authentication required".into());
      info!(target: "stanzle", endpoint, %status, ?elapsed, "Unauthorized");
      return Err(ClientError::Auth(msg));
    }
    if status == StatusCode::NOT_FOUND {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_error(&body).unwrap_or_else(|| format!("{} not found", endpoint));
      info!(target: "stanzle", endpoint, %status, ?elapsed, "Not found");
      return Err(ClientError::NotFound(msg));
    }
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(target: "stanzle", endpoint, %status, ?elapsed, error = %msg, "Backend returned an error status");
      return Err(ClientError::Network(format!("HTTP {}: {}", status, msg)));
    }

    let body = res
      .json::<T>()
      .await
      .map_err(|e| ClientError::Network(format!("invalid JSON from {}: {}", endpoint, e)))?;
    debug!(target: "stanzle", endpoint, %status, ?elapsed, "Backend call ok");
    Ok(body)
  }

  // --- Challenge + archive ---

  #[instrument(level = "info", skip(self))]
  pub async fn fetch_challenge(&self) -> Result<ChallengeWire, ClientError> {
    let out: ChallengeOut = self.send(self.get("/api/challenge"), "challenge").await?;
    match (out.success, out.challenge) {
      (true, Some(c)) => Ok(c),
      (_, _) => Err(ClientError::Rejected(out.error.unwrap_or_else(|| "no challenge in response".into()))),
    }
  }

  #[instrument(level = "debug", skip(self, challenge), fields(theme = %challenge.theme))]
  pub async fn track_challenge(&self, challenge: &ChallengeWire) -> Result<(), ClientError> {
    let ack: AckOut = self.send(self.post("/api/archive/track").json(challenge), "archive_track").await?;
    if ack.success { Ok(()) } else { Err(ClientError::Rejected(ack.failure_reason())) }
  }

  #[instrument(level = "info", skip(self))]
  pub async fn archive_challenges(&self) -> Result<Vec<ArchivedChallenge>, ClientError> {
    let out: ArchiveListOut = self.send(self.get("/api/archive/challenges"), "archive_list").await?;
    if !out.success {
      return Err(ClientError::Rejected(out.error.unwrap_or_else(|| "archive unavailable".into())));
    }
    Ok(out.challenges.into_values().collect())
  }

  /// `None` when the archive has nothing for that day.
  #[instrument(level = "info", skip(self), fields(%date))]
  pub async fn archive_challenge(&self, date: NaiveDate) -> Result<Option<ArchivedChallenge>, ClientError> {
    let path = format!("/api/archive/challenge/{}", date.format("%Y-%m-%d"));
    match self.send::<ArchiveEntryOut>(self.get(&path), "archive_entry").await {
      Ok(out) if out.success => Ok(out.challenge),
      Ok(_) => Ok(None),
      Err(ClientError::NotFound(_)) => Ok(None),
      Err(e) => Err(e),
    }
  }

  // --- Analysis + scoring ---

  #[instrument(level = "info", skip(self, req), fields(mode = %req.mode.as_str(), poem_len = req.poem.len()))]
  pub async fn analyze(&self, req: &AnalyzeIn<'_>) -> Result<Guess, ClientError> {
    let out: AnalyzeOut = self.send(self.post("/api/analyze").json(req), "analyze").await?;
    match (out.success, out.result) {
      (true, Some(mut guess)) => {
        guess.origin = GuessOrigin::Remote;
        Ok(guess)
      }
      _ => Err(ClientError::Rejected(out.error.unwrap_or_else(|| "Failed to analyze poem".into()))),
    }
  }

  #[instrument(level = "info", skip(self, req), fields(difficulty = %req.difficulty.as_str(), poem_len = req.poem.len()))]
  pub async fn score(&self, req: &ScoreIn<'_>) -> Result<ScoreResult, ClientError> {
    let out: ScoreOut = self.send(self.post("/api/score").json(req), "score").await?;
    match (out.success, out.result) {
      (true, Some(mut result)) => {
        result.origin = ScoreOrigin::Remote;
        Ok(result)
      }
      _ => Err(ClientError::Rejected(out.error.unwrap_or_else(|| "Failed to score poem".into()))),
    }
  }

  // --- Daily submissions ---

  #[instrument(level = "info", skip(self, token), fields(token = %mask_token(token)))]
  pub async fn submission_status(&self, token: &str) -> Result<SubmissionStatusOut, ClientError> {
    self.send(Self::authed(self.get("/api/daily/submission-status"), token), "submission_status").await
  }

  #[instrument(level = "info", skip(self, token, body), fields(token = %mask_token(token), score = body.score))]
  pub async fn submit_daily(&self, token: &str, body: &DailySubmitIn) -> Result<DailySubmitOut, ClientError> {
    let out: DailySubmitOut =
      self.send(Self::authed(self.post("/api/daily/submit").json(body), token), "daily_submit").await?;
    if out.success {
      Ok(out)
    } else {
      let msg = out.message.or(out.error).unwrap_or_else(|| "Failed to submit daily score".into());
      Err(ClientError::Rejected(msg))
    }
  }

  #[instrument(level = "info", skip(self, token), fields(token = %mask_token(token)))]
  pub async fn daily_history(&self, token: &str) -> Result<DailyHistoryOut, ClientError> {
    let out: DailyHistoryOut = self.send(Self::authed(self.get("/api/daily/history"), token), "daily_history").await?;
    if out.success {
      Ok(out)
    } else {
      Err(ClientError::Rejected(out.message.unwrap_or_else(|| "history unavailable".into())))
    }
  }

  #[instrument(level = "info", skip(self, token), fields(token = %mask_token(token)))]
  pub async fn submission_history(&self, token: &str) -> Result<SubmissionHistoryOut, ClientError> {
    let out: SubmissionHistoryOut =
      self.send(Self::authed(self.get("/api/user/submission-history"), token), "submission_history").await?;
    if out.success {
      Ok(out)
    } else {
      Err(ClientError::Rejected(out.message.unwrap_or_else(|| "history unavailable".into())))
    }
  }

  // --- Auth ---

  #[instrument(level = "info", skip(self, password))]
  pub async fn login(&self, username: &str, password: &str) -> Result<(String, UserStats), ClientError> {
    let out: AuthOut = self.send(self.post("/api/auth/login").json(&LoginIn { username, password }), "login").await?;
    match (out.success, out.token, out.user) {
      (true, Some(token), Some(user)) => Ok((token, user)),
      (true, Some(token), None) => Ok((token, UserStats { username: username.to_string(), ..Default::default() })),
      _ => Err(ClientError::Rejected(out.message.or(out.error).unwrap_or_else(|| "Login failed".into()))),
    }
  }

  /// Returns the server's confirmation message.
  #[instrument(level = "info", skip(self, email, password))]
  pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<String, ClientError> {
    let body = RegisterIn { username, email, password };
    let out: AuthOut = self.send(self.post("/api/auth/register").json(&body), "register").await?;
    let msg = out.message.or(out.error);
    if out.success {
      Ok(msg.unwrap_or_else(|| "User registered successfully".into()))
    } else {
      Err(ClientError::Rejected(msg.unwrap_or_else(|| "Registration failed".into())))
    }
  }

  #[instrument(level = "info", skip(self, token), fields(token = %mask_token(token)))]
  pub async fn logout(&self, token: &str) -> Result<(), ClientError> {
    let ack: AckOut = self.send(Self::authed(self.post("/api/auth/logout"), token), "logout").await?;
    if ack.success { Ok(()) } else { Err(ClientError::Rejected(ack.failure_reason())) }
  }

  #[instrument(level = "info", skip(self, token), fields(token = %mask_token(token)))]
  pub async fn verify(&self, token: &str) -> Result<UserStats, ClientError> {
    let out: VerifyOut = self.send(Self::authed(self.get("/api/auth/verify"), token), "verify").await?;
    match (out.success, out.user) {
      (true, Some(user)) => Ok(user),
      _ => Err(ClientError::Auth("session is no longer valid".into())),
    }
  }
}
