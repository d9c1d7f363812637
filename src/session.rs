//! Logged-in user state: token + stats in the local store, and the auth calls
//! that create, refresh, and destroy it.

use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::domain::UserStats;
use crate::error::ClientError;
use crate::protocol::DailySubmitOut;
use crate::store::{LocalStore, AUTH_TOKEN_KEY, USER_KEY};

#[derive(Clone, Debug, PartialEq)]
pub struct UserSessionState {
  pub auth_token: String,
  pub user: UserStats,
}

pub struct SessionManager<S> {
  store: S,
}

impl<S: LocalStore> SessionManager<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  /// Stored token, if any. A read failure counts as logged out.
  pub fn token(&self) -> Option<String> {
    match self.store.get(AUTH_TOKEN_KEY) {
      Ok(t) => t.filter(|t| !t.trim().is_empty()),
      Err(e) => {
        warn!(target: "session", error = %e, "Could not read auth token");
        None
      }
    }
  }

  /// Stored user stats; malformed JSON reads as absent.
  pub fn user(&self) -> Option<UserStats> {
    let raw = self.store.get(USER_KEY).ok().flatten()?;
    match serde_json::from_str::<UserStats>(&raw) {
      Ok(u) => Some(u),
      Err(e) => {
        warn!(target: "session", error = %e, "Stored user record is malformed");
        None
      }
    }
  }

  pub fn state(&self) -> Option<UserSessionState> {
    let auth_token = self.token()?;
    let user = self.user().unwrap_or_default();
    Some(UserSessionState { auth_token, user })
  }

  pub fn save(&self, token: &str, user: &UserStats) -> Result<(), ClientError> {
    self.store.set(AUTH_TOKEN_KEY, token)?;
    self.save_user(user)
  }

  fn save_user(&self, user: &UserStats) -> Result<(), ClientError> {
    let json = serde_json::to_string(user).map_err(|e| ClientError::Storage(e.to_string()))?;
    self.store.set(USER_KEY, &json)
  }

  pub fn clear(&self) -> Result<(), ClientError> {
    self.store.remove(AUTH_TOKEN_KEY)?;
    self.store.remove(USER_KEY)
  }

  #[instrument(level = "info", skip(self, api, password))]
  pub async fn login(&self, api: &ApiClient, username: &str, password: &str) -> Result<UserSessionState, ClientError> {
    if username.trim().is_empty() || password.is_empty() {
      return Err(ClientError::Validation("Missing username or password".into()));
    }
    let (token, user) = api.login(username, password).await?;
    self.save(&token, &user)?;
    info!(target: "session", username = %user.username, "Logged in");
    Ok(UserSessionState { auth_token: token, user })
  }

  #[instrument(level = "info", skip(self, api, email, password))]
  pub async fn register(&self, api: &ApiClient, username: &str, email: &str, password: &str) -> Result<String, ClientError> {
    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
      return Err(ClientError::Validation("Missing required fields".into()));
    }
    api.register(username, email, password).await
  }

  /// Local state is destroyed even when the server call fails.
  #[instrument(level = "info", skip(self, api))]
  pub async fn logout(&self, api: &ApiClient) -> Result<(), ClientError> {
    if let Some(token) = self.token() {
      if let Err(e) = api.logout(&token).await {
        warn!(target: "session", error = %e, "Logout call failed; clearing local session anyway");
      }
    }
    self.clear()?;
    info!(target: "session", "Logged out");
    Ok(())
  }

  /// Refresh stats from the server. An auth rejection ends the local session.
  #[instrument(level = "info", skip(self, api))]
  pub async fn verify(&self, api: &ApiClient) -> Result<Option<UserStats>, ClientError> {
    let Some(token) = self.token() else { return Ok(None) };
    match api.verify(&token).await {
      Ok(user) => {
        self.save_user(&user)?;
        Ok(Some(user))
      }
      Err(ClientError::Auth(msg)) => {
        warn!(target: "session", reason = %msg, "Stored session rejected; clearing it");
        self.clear()?;
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  /// Apply an acknowledged daily submission to the stored stats.
  /// Server totals win when present.
  pub fn apply_submission_ack(&self, score: u64, ack: &DailySubmitOut) -> Result<Option<UserStats>, ClientError> {
    let Some(mut user) = self.user() else { return Ok(None) };
    let mut local = user.clone();
    local.record_game(score);
    user.games_played = local.games_played;
    user.total_score = ack.total_score.unwrap_or(local.total_score);
    user.best_score = ack.best_score.unwrap_or(local.best_score);
    self.save_user(&user)?;
    Ok(Some(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  fn ack(total: Option<u64>, best: Option<u64>) -> DailySubmitOut {
    DailySubmitOut { success: true, total_score: total, best_score: best, daily_score: None, message: None, error: None }
  }

  fn seeded() -> SessionManager<MemoryStore> {
    let s = SessionManager::new(MemoryStore::new());
    let user = UserStats { username: "wren".into(), games_played: 4, best_score: 70, total_score: 200, ..Default::default() };
    s.save("tok-abc", &user).unwrap();
    s
  }

  #[test]
  fn stats_follow_local_rule_without_server_totals() {
    let s = seeded();
    let u = s.apply_submission_ack(85, &ack(None, None)).unwrap().unwrap();
    assert_eq!((u.games_played, u.total_score, u.best_score), (5, 285, 85));
    assert_eq!(s.user().unwrap(), u);
  }

  #[test]
  fn server_totals_override_local_arithmetic() {
    let s = seeded();
    let u = s.apply_submission_ack(40, &ack(Some(1000), Some(99))).unwrap().unwrap();
    assert_eq!((u.games_played, u.total_score, u.best_score), (5, 1000, 99));
  }

  #[test]
  fn no_user_means_nothing_to_update() {
    let s = SessionManager::new(MemoryStore::new());
    assert!(s.apply_submission_ack(10, &ack(None, None)).unwrap().is_none());
    assert!(s.state().is_none());
  }

  #[test]
  fn clear_destroys_session() {
    let s = seeded();
    assert_eq!(s.state().unwrap().auth_token, "tok-abc");
    s.clear().unwrap();
    assert!(s.token().is_none());
    assert!(s.user().is_none());
  }

  #[test]
  fn malformed_user_record_reads_as_absent() {
    let store = MemoryStore::new();
    store.set(USER_KEY, "{broken").unwrap();
    store.set(AUTH_TOKEN_KEY, "t").unwrap();
    let s = SessionManager::new(store);
    assert!(s.user().is_none());
    assert_eq!(s.state().unwrap().user, UserStats::default());
  }
}
