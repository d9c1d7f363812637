//! Domain models: challenge, selection enums, guesses, scores, eligibility, user stats.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;
use crate::util::lenient_score;

/// Easy mode scores one chosen dimension, hard mode scores both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Easy,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Hard => "hard",
    }
  }
}

/// The single dimension chosen in easy mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
  Theme,
  Emotion,
}

impl Focus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Focus::Theme => "theme",
      Focus::Emotion => "emotion",
    }
  }

  pub fn parse(s: &str) -> Option<Focus> {
    match s.trim().to_ascii_lowercase().as_str() {
      "theme" => Some(Focus::Theme),
      "emotion" => Some(Focus::Emotion),
      _ => None,
    }
  }
}

/// UI focus state. Easy mode starts `Unset` and the player must choose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FocusSelection {
  #[default]
  Unset,
  Single(Focus),
  Both,
}

impl FocusSelection {
  pub fn single(&self) -> Option<Focus> {
    match self {
      FocusSelection::Single(f) => Some(*f),
      _ => None,
    }
  }
}

/// Daily: one cached challenge per calendar day, gated persisted submission.
/// Unlimited: fresh challenge every run, nothing persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayMode {
  Daily,
  Unlimited,
}

impl PlayMode {
  /// Derive the operating mode from the launch context (a path or title).
  pub fn detect(context: &str) -> PlayMode {
    if context.to_ascii_lowercase().contains("unlimited") {
      PlayMode::Unlimited
    } else {
      PlayMode::Daily
    }
  }

  pub fn is_daily(&self) -> bool {
    matches!(self, PlayMode::Daily)
  }
}

/// Where did the active challenge come from?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeOrigin {
  Remote,
  Fallback,
  Cached,
}

/// Theme + emotion prompt and the required word bank for one day or one run.
#[derive(Clone, Debug, PartialEq)]
pub struct Challenge {
  pub theme: String,
  pub emotion: String,
  pub required_words: Vec<String>,
  pub issued_date: NaiveDate,
  pub origin: ChallengeOrigin,
}

impl Challenge {
  /// Build a challenge, rejecting blank prompts and an empty word bank.
  pub fn new(
    theme: impl Into<String>,
    emotion: impl Into<String>,
    required_words: Vec<String>,
    issued_date: NaiveDate,
    origin: ChallengeOrigin,
  ) -> Result<Self, ClientError> {
    let theme = theme.into().trim().to_string();
    let emotion = emotion.into().trim().to_string();
    let required_words: Vec<String> = required_words
      .into_iter()
      .map(|w| w.trim().to_string())
      .filter(|w| !w.is_empty())
      .collect();
    if theme.is_empty() || emotion.is_empty() {
      return Err(ClientError::Validation("challenge theme and emotion must be non-empty".into()));
    }
    if required_words.is_empty() {
      return Err(ClientError::Validation("challenge word bank must be non-empty".into()));
    }
    Ok(Self { theme, emotion, required_words, issued_date, origin })
  }

  /// Same content, ignoring origin and issue date.
  pub fn same_prompt(&self, other: &Challenge) -> bool {
    self.theme == other.theme && self.emotion == other.emotion && self.required_words == other.required_words
  }

  pub fn intended(&self, focus: Focus) -> &str {
    match focus {
      Focus::Theme => &self.theme,
      Focus::Emotion => &self.emotion,
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuessOrigin {
  #[default]
  Remote,
  Local,
}

/// The analyzer's reading of the poem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guess {
  #[serde(default)]
  pub theme: Option<String>,
  #[serde(default)]
  pub emotion: Option<String>,
  #[serde(default = "default_confidence", deserialize_with = "lenient_confidence")]
  pub confidence: f64,
  #[serde(skip)]
  pub origin: GuessOrigin,
}

fn default_confidence() -> f64 {
  0.5
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
  Ok(lenient_score(deserializer)?.unwrap_or_else(default_confidence))
}

impl Guess {
  pub fn for_focus(&self, focus: Focus) -> Option<&str> {
    match focus {
      Focus::Theme => self.theme.as_deref(),
      Focus::Emotion => self.emotion.as_deref(),
    }
  }

  /// Confidence clamped into [0, 1].
  pub fn confidence(&self) -> f64 {
    if self.confidence.is_finite() { self.confidence.clamp(0.0, 1.0) } else { 0.5 }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoreOrigin {
  #[default]
  Remote,
  Local,
}

/// Scores as returned by the scorer. Components are absent when a mode
/// does not use them; `total_score` is the server's authoritative override.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
  #[serde(default, deserialize_with = "lenient_score")]
  pub theme_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient_score")]
  pub emotion_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient_score")]
  pub creativity_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient_score")]
  pub total_score: Option<f64>,
  #[serde(default)]
  pub feedback: String,
  #[serde(skip)]
  pub origin: ScoreOrigin,
}

/// Why the gate said no.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
  /// No token, or the server refused it.
  NotLoggedIn,
  /// The status check itself failed.
  Unreachable,
  /// The server answered `can_submit: false`.
  Server,
}

/// Fresh answer from the gate. Never cached.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionEligibility {
  pub can_submit: bool,
  pub denial: Option<Denial>,
  pub reason: Option<String>,
  pub previous_score: Option<f64>,
}

impl SubmissionEligibility {
  pub fn open() -> Self {
    Self { can_submit: true, denial: None, reason: None, previous_score: None }
  }

  pub fn denied(denial: Denial, reason: impl Into<String>) -> Self {
    Self { can_submit: false, denial: Some(denial), reason: Some(reason.into()), previous_score: None }
  }
}

/// Per-user totals as the server reports them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
  pub username: String,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub games_played: u64,
  #[serde(default)]
  pub best_score: u64,
  #[serde(default)]
  pub total_score: u64,
}

impl UserStats {
  /// Apply one acknowledged game locally.
  pub fn record_game(&mut self, score: u64) {
    self.games_played += 1;
    self.total_score += score;
    self.best_score = self.best_score.max(score);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
  }

  #[test]
  fn challenge_rejects_blank_fields_and_empty_bank() {
    assert!(Challenge::new("", "Joy", vec!["a".into()], day(), ChallengeOrigin::Remote).is_err());
    assert!(Challenge::new("Love", "  ", vec!["a".into()], day(), ChallengeOrigin::Remote).is_err());
    assert!(Challenge::new("Love", "Joy", vec![" ".into()], day(), ChallengeOrigin::Remote).is_err());
    let ok = Challenge::new(" Love ", "Joy", vec!["heart".into(), "".into()], day(), ChallengeOrigin::Remote).unwrap();
    assert_eq!(ok.theme, "Love");
    assert_eq!(ok.required_words, vec!["heart".to_string()]);
  }

  #[test]
  fn play_mode_detection_from_context() {
    assert_eq!(PlayMode::detect("/unlimited.html"), PlayMode::Unlimited);
    assert_eq!(PlayMode::detect("Stanzle Unlimited"), PlayMode::Unlimited);
    assert_eq!(PlayMode::detect("/"), PlayMode::Daily);
    assert_eq!(PlayMode::detect("daily"), PlayMode::Daily);
  }

  #[test]
  fn guess_decodes_with_missing_fields() {
    let g: Guess = serde_json::from_str(r#"{"emotion": "Joy"}"#).unwrap();
    assert_eq!(g.theme, None);
    assert_eq!(g.for_focus(Focus::Emotion), Some("Joy"));
    assert_eq!(g.confidence(), 0.5);
    let wild: Guess = serde_json::from_str(r#"{"theme": "Love", "confidence": 3.0}"#).unwrap();
    assert_eq!(wild.confidence(), 1.0);
  }

  #[test]
  fn guess_confidence_tolerates_strings_and_nulls() {
    let quoted: Guess = serde_json::from_str(r#"{"theme": "Love", "emotion": "Joy", "confidence": "0.85"}"#).unwrap();
    assert_eq!(quoted.theme.as_deref(), Some("Love"));
    assert_eq!(quoted.confidence(), 0.85);
    let junk: Guess = serde_json::from_str(r#"{"theme": "Love", "confidence": "very"}"#).unwrap();
    assert_eq!(junk.confidence(), 0.5);
    let null: Guess = serde_json::from_str(r#"{"theme": "Love", "confidence": null}"#).unwrap();
    assert_eq!(null.confidence(), 0.5);
  }

  #[test]
  fn score_result_uses_camel_case_wire_names() {
    let s: ScoreResult = serde_json::from_str(
      r#"{"themeScore": 30, "creativityScore": "15", "totalScore": null, "feedback": "ok"}"#,
    )
    .unwrap();
    assert_eq!(s.theme_score, Some(30.0));
    assert_eq!(s.emotion_score, None);
    assert_eq!(s.creativity_score, Some(15.0));
    assert_eq!(s.total_score, None);
  }

  #[test]
  fn record_game_updates_totals() {
    let mut u = UserStats { username: "ada".into(), best_score: 60, total_score: 100, games_played: 2, ..Default::default() };
    u.record_game(45);
    assert_eq!((u.games_played, u.total_score, u.best_score), (3, 145, 60));
    u.record_game(88);
    assert_eq!(u.best_score, 88);
  }
}
