//! In-process fake of the game backend, served by axum on an ephemeral port.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use stanzle_client::api::ApiClient;

pub const GOOD_TOKEN: &str = "tok-good-123456";
pub const PASSWORD: &str = "secret";
const THEMES: [&str; 3] = ["Adventure", "Nature", "Dreams"];

pub struct FakeState {
  pub challenge_calls: AtomicUsize,
  pub track_calls: AtomicUsize,
  pub analyze_calls: AtomicUsize,
  pub score_calls: AtomicUsize,
  pub submit_calls: AtomicUsize,
  pub daily_open: AtomicBool,
  pub daily_score: Mutex<Option<u64>>,
  pub last_submit: Mutex<Option<Value>>,
  pub last_cookie: Mutex<Option<String>>,
}

impl FakeState {
  fn new() -> Self {
    Self {
      challenge_calls: AtomicUsize::new(0),
      track_calls: AtomicUsize::new(0),
      analyze_calls: AtomicUsize::new(0),
      score_calls: AtomicUsize::new(0),
      submit_calls: AtomicUsize::new(0),
      daily_open: AtomicBool::new(true),
      daily_score: Mutex::new(None),
      last_submit: Mutex::new(None),
      last_cookie: Mutex::new(None),
    }
  }

  pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }
}

type Shared = Arc<FakeState>;
type Reply = (StatusCode, Json<Value>);

fn authorized(state: &FakeState, headers: &HeaderMap) -> bool {
  if let Some(cookie) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
    *state.last_cookie.lock().unwrap() = Some(cookie.to_string());
  }
  headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .map(|v| v == format!("Bearer {}", GOOD_TOKEN))
    .unwrap_or(false)
}

fn unauthorized() -> Reply {
  (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "Invalid token" })))
}

async fn challenge(State(state): State<Shared>) -> Reply {
  let n = state.challenge_calls.fetch_add(1, Ordering::SeqCst);
  let body = json!({
    "success": true,
    "challenge": { "theme": THEMES[n % THEMES.len()], "emotion": "Excitement", "words": ["mountain", "journey", "river"] }
  });
  (StatusCode::OK, Json(body))
}

async fn track(State(state): State<Shared>, Json(_body): Json<Value>) -> Reply {
  state.track_calls.fetch_add(1, Ordering::SeqCst);
  (StatusCode::OK, Json(json!({ "success": true })))
}

async fn analyze(State(state): State<Shared>, Json(_body): Json<Value>) -> Reply {
  state.analyze_calls.fetch_add(1, Ordering::SeqCst);
  (StatusCode::OK, Json(json!({ "success": true, "result": { "theme": "Adventure", "emotion": "Joy", "confidence": 0.8 } })))
}

/// Easy mode answers with a total override; hard mode sends a numeric string
/// and no total.
async fn score(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
  state.score_calls.fetch_add(1, Ordering::SeqCst);
  let result = if body["difficulty"] == "easy" {
    json!({ "themeScore": 70, "creativityScore": 18, "totalScore": 91, "feedback": "Vivid imagery." })
  } else {
    json!({ "themeScore": "38", "emotionScore": 20, "creativityScore": 15, "totalScore": null, "feedback": "Strong close." })
  };
  (StatusCode::OK, Json(json!({ "success": true, "result": result })))
}

async fn submission_status(State(state): State<Shared>, headers: HeaderMap) -> Reply {
  if !authorized(&state, &headers) {
    return unauthorized();
  }
  if state.daily_open.load(Ordering::SeqCst) {
    (StatusCode::OK, Json(json!({ "can_submit": true })))
  } else {
    let prev = *state.daily_score.lock().unwrap();
    (StatusCode::OK, Json(json!({ "can_submit": false, "message": "Already submitted today's challenge", "daily_score": prev })))
  }
}

async fn submit_daily(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
  if !authorized(&state, &headers) {
    return unauthorized();
  }
  state.submit_calls.fetch_add(1, Ordering::SeqCst);
  if !state.daily_open.swap(false, Ordering::SeqCst) {
    return (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "message": "Already submitted today's challenge" })));
  }
  let score = body["score"].as_u64().unwrap_or(0);
  *state.daily_score.lock().unwrap() = Some(score);
  *state.last_submit.lock().unwrap() = Some(body);
  (StatusCode::OK, Json(json!({ "success": true, "total_score": 500, "best_score": 90, "daily_score": score })))
}

async fn login(Json(body): Json<Value>) -> Reply {
  if body["password"] != PASSWORD {
    return (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "message": "Invalid credentials" })));
  }
  let user = json!({ "username": body["username"], "games_played": 0, "best_score": 0, "total_score": 0 });
  (StatusCode::OK, Json(json!({ "success": true, "token": GOOD_TOKEN, "user": user })))
}

async fn register(Json(body): Json<Value>) -> Reply {
  let username = body["username"].as_str().unwrap_or_default();
  let password = body["password"].as_str().unwrap_or_default();
  if username == "poet" {
    return (StatusCode::OK, Json(json!({ "success": false, "message": "Username already exists" })));
  }
  if password.len() < 6 {
    return (StatusCode::OK, Json(json!({ "success": false, "message": "Password must be at least 6 characters" })));
  }
  let user = json!({ "username": username, "email": body["email"], "created_at": "2024-01-01T09:00:00" });
  (StatusCode::OK, Json(json!({ "success": true, "message": "User registered successfully", "user": user })))
}

async fn daily_history(State(state): State<Shared>, headers: HeaderMap) -> Reply {
  if !authorized(&state, &headers) {
    return unauthorized();
  }
  let scores = json!({
    "2024-01-01": { "score": 91, "submitted": true },
    "2023-12-31": { "score": 64, "submitted": true }
  });
  (StatusCode::OK, Json(json!({ "success": true, "daily_scores": scores, "current_streak": 2, "best_daily_score": 91 })))
}

async fn submission_history(State(state): State<Shared>, headers: HeaderMap) -> Reply {
  if !authorized(&state, &headers) {
    return unauthorized();
  }
  let record = json!({
    "date": "2024-01-01",
    "score": 91,
    "mode": "easy",
    "easy_selection": "theme",
    "word_bank_used": true,
    "theme": "Adventure",
    "emotion": "Excitement",
    "required_words": ["mountain", "journey", "river"],
    "poem_text": "Up the mountain",
    "poem_html": "Up the mountain",
    "ai_guess": { "theme": "Adventure", "emotion": "Joy", "confidence": 0.8 },
    "submitted_at": "2024-01-01T10:15:00"
  });
  (StatusCode::OK, Json(json!({ "success": true, "submissions": { "2024-01-01": record }, "total_submissions": 1 })))
}

async fn logout() -> Reply {
  (StatusCode::OK, Json(json!({ "success": true })))
}

async fn verify(State(state): State<Shared>, headers: HeaderMap) -> Reply {
  if !authorized(&state, &headers) {
    return unauthorized();
  }
  let user = json!({ "username": "poet", "games_played": 3, "best_score": 88, "total_score": 210 });
  (StatusCode::OK, Json(json!({ "success": true, "user": user })))
}

async fn archive_list() -> Reply {
  let entry = json!({ "date": "2024-01-01", "theme": "Hope", "emotion": "Joy", "words": ["dawn"], "submissions_count": 4, "avg_score": 61.5, "best_score": 90 });
  (StatusCode::OK, Json(json!({ "success": true, "challenges": { "2024-01-01": entry } })))
}

async fn archive_entry(Path(date): Path<String>) -> Reply {
  if date != "2024-01-01" {
    return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "error": "No challenge found for this date" })));
  }
  let entry = json!({ "date": date, "theme": "Hope", "emotion": "Joy", "words": ["dawn"] });
  (StatusCode::OK, Json(json!({ "success": true, "challenge": entry })))
}

pub async fn spawn_backend() -> (String, Arc<FakeState>) {
  let state = Arc::new(FakeState::new());
  let app = Router::new()
    .route("/api/challenge", get(challenge))
    .route("/api/archive/track", post(track))
    .route("/api/archive/challenges", get(archive_list))
    .route("/api/archive/challenge/:date", get(archive_entry))
    .route("/api/analyze", post(analyze))
    .route("/api/score", post(score))
    .route("/api/daily/submission-status", get(submission_status))
    .route("/api/daily/submit", post(submit_daily))
    .route("/api/daily/history", get(daily_history))
    .route("/api/user/submission-history", get(submission_history))
    .route("/api/auth/register", post(register))
    .route("/api/auth/login", post(login))
    .route("/api/auth/logout", post(logout))
    .route("/api/auth/verify", get(verify))
    .with_state(state.clone());

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  (format!("http://{}", addr), state)
}

/// A URL nothing is listening on.
pub async fn dead_backend_url() -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("http://{}", addr)
}

pub fn api(base_url: &str) -> ApiClient {
  ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

pub fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("stanzle-it-{}-{}", name, std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  dir
}
