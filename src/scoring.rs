//! Guess → score → render.
//!
//! Analysis and scoring each go to the backend first. When the backend is
//! unreachable the pipeline switches to a local strategy that implements the
//! same trait: a random guess, and a word-overlap score with random
//! creativity. The local scorer is a stand-in, not a grader.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::domain::{Challenge, Difficulty, Focus, Guess, GuessOrigin, PlayMode, ScoreOrigin, ScoreResult};
use crate::error::ClientError;
use crate::protocol::{AnalyzeIn, ScoreIn};
use crate::seeds::{builtin_feedback_templates, pick_feedback, FallbackTable};

pub const EASY_FOCUS_CAP: u64 = 80;
pub const HARD_DIMENSION_CAP: u64 = 40;
pub const CREATIVITY_CAP: u64 = 20;

/// Everything a scorer needs for one poem.
#[derive(Clone, Copy, Debug)]
pub struct ScoreRequest<'a> {
  pub poem: &'a str,
  pub challenge: &'a Challenge,
  pub guess: &'a Guess,
  pub difficulty: Difficulty,
  pub focus: Option<Focus>,
}

pub trait Analyzer: Send + Sync {
  fn analyze(&self, poem: &str, difficulty: Difficulty, focus: Option<Focus>) -> impl Future<Output = Result<Guess, ClientError>> + Send;
}

pub trait Scorer: Send + Sync {
  fn score(&self, req: &ScoreRequest<'_>) -> impl Future<Output = Result<ScoreResult, ClientError>> + Send;
}

impl Analyzer for ApiClient {
  async fn analyze(&self, poem: &str, difficulty: Difficulty, focus: Option<Focus>) -> Result<Guess, ClientError> {
    ApiClient::analyze(self, &AnalyzeIn { poem, mode: difficulty, focus }).await
  }
}

impl Scorer for ApiClient {
  async fn score(&self, req: &ScoreRequest<'_>) -> Result<ScoreResult, ClientError> {
    let body = ScoreIn {
      poem: req.poem,
      intended_theme: &req.challenge.theme,
      intended_emotion: &req.challenge.emotion,
      ai_guess: req.guess,
      difficulty: req.difficulty,
      focus: req.focus,
    };
    ApiClient::score(self, &body).await
  }
}

fn lock_rng(rng: &Mutex<StdRng>) -> std::sync::MutexGuard<'_, StdRng> {
  rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Random theme and/or emotion at confidence 0.5.
pub struct LocalGuesser {
  table: FallbackTable,
  rng: Mutex<StdRng>,
}

impl LocalGuesser {
  pub fn new(table: FallbackTable) -> Self {
    Self { table, rng: Mutex::new(StdRng::from_entropy()) }
  }

  pub fn seeded(table: FallbackTable, seed: u64) -> Self {
    Self { table, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
  }

  pub fn guess(&self, difficulty: Difficulty, focus: Option<Focus>) -> Guess {
    let mut rng = lock_rng(&self.rng);
    let (theme, emotion) = match (difficulty, focus) {
      (Difficulty::Easy, Some(Focus::Theme)) => (Some(self.table.random_theme(&mut *rng)), None),
      (Difficulty::Easy, Some(Focus::Emotion)) => (None, Some(self.table.random_emotion(&mut *rng))),
      _ => (Some(self.table.random_theme(&mut *rng)), Some(self.table.random_emotion(&mut *rng))),
    };
    Guess { theme, emotion, confidence: 0.5, origin: GuessOrigin::Local }
  }
}

impl Analyzer for LocalGuesser {
  async fn analyze(&self, _poem: &str, difficulty: Difficulty, focus: Option<Focus>) -> Result<Guess, ClientError> {
    Ok(self.guess(difficulty, focus))
  }
}

/// Word-overlap similarity in [0, 1].
///
/// Counts intended words that contain, or are contained in, some guessed
/// word, divided by the longer of the two word lists.
pub fn calculate_match(intended: &str, guessed: &str) -> f64 {
  let intended = intended.to_lowercase();
  let guessed = guessed.to_lowercase();
  let want: Vec<&str> = intended.split_whitespace().collect();
  let got: Vec<&str> = guessed.split_whitespace().collect();
  if want.is_empty() || got.is_empty() {
    return 0.0;
  }
  let hits = want.iter().filter(|w| got.iter().any(|g| g.contains(*w) || w.contains(*g))).count();
  hits as f64 / want.len().max(got.len()) as f64
}

pub struct LocalFallbackScorer {
  feedback: Vec<String>,
  rng: Mutex<StdRng>,
}

impl LocalFallbackScorer {
  pub fn new(feedback: Vec<String>) -> Self {
    Self { feedback, rng: Mutex::new(StdRng::from_entropy()) }
  }

  pub fn seeded(feedback: Vec<String>, seed: u64) -> Self {
    Self { feedback, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
  }

  /// Components only; `total_score` stays empty so the rendered total is
  /// always the sum of what is shown.
  pub fn score_locally(&self, req: &ScoreRequest<'_>) -> ScoreResult {
    let mut rng = lock_rng(&self.rng);
    let creativity: u32 = rng.gen_range(5..25);
    let mut result = ScoreResult {
      creativity_score: Some(f64::from(creativity)),
      feedback: pick_feedback(&self.feedback, &mut *rng),
      origin: ScoreOrigin::Local,
      ..Default::default()
    };
    match (req.difficulty, req.focus) {
      (Difficulty::Easy, Some(focus)) => {
        let m = calculate_match(req.challenge.intended(focus), req.guess.for_focus(focus).unwrap_or(""));
        let points = Some((m * EASY_FOCUS_CAP as f64).floor());
        match focus {
          Focus::Theme => result.theme_score = points,
          Focus::Emotion => result.emotion_score = points,
        }
      }
      _ => {
        let t = calculate_match(&req.challenge.theme, req.guess.theme.as_deref().unwrap_or(""));
        let e = calculate_match(&req.challenge.emotion, req.guess.emotion.as_deref().unwrap_or(""));
        result.theme_score = Some((t * HARD_DIMENSION_CAP as f64).floor());
        result.emotion_score = Some((e * HARD_DIMENSION_CAP as f64).floor());
      }
    }
    result
  }
}

impl Default for LocalFallbackScorer {
  fn default() -> Self {
    Self::new(builtin_feedback_templates())
  }
}

impl Scorer for LocalFallbackScorer {
  async fn score(&self, req: &ScoreRequest<'_>) -> Result<ScoreResult, ClientError> {
    Ok(self.score_locally(req))
  }
}

// ---------- Rendering ----------

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreLine {
  pub label: &'static str,
  pub points: u64,
  pub cap: u64,
}

/// What the player sees after scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreReport {
  pub lines: Vec<ScoreLine>,
  pub total: u64,
  pub feedback: String,
  pub guessed_theme: Option<String>,
  pub guessed_emotion: Option<String>,
  pub confidence_pct: u32,
  pub scored_locally: bool,
}

fn points(v: Option<f64>, cap: u64) -> u64 {
  match v {
    Some(x) if x.is_finite() && x > 0.0 => (x.floor() as u64).min(cap),
    _ => 0,
  }
}

/// Easy mode shows the chosen dimension (out of 80) and creativity; hard mode
/// shows theme and emotion (out of 40 each) and creativity. The total is the
/// server's when it sent one, otherwise the sum of the shown lines.
pub fn render(result: &ScoreResult, guess: &Guess, difficulty: Difficulty, focus: Option<Focus>) -> ScoreReport {
  let mut lines = Vec::with_capacity(3);
  let (mut guessed_theme, mut guessed_emotion) = (None, None);
  match (difficulty, focus) {
    (Difficulty::Easy, Some(Focus::Theme)) => {
      lines.push(ScoreLine { label: "Theme", points: points(result.theme_score, EASY_FOCUS_CAP), cap: EASY_FOCUS_CAP });
      guessed_theme = guess.theme.clone();
    }
    (Difficulty::Easy, Some(Focus::Emotion)) => {
      lines.push(ScoreLine { label: "Emotion", points: points(result.emotion_score, EASY_FOCUS_CAP), cap: EASY_FOCUS_CAP });
      guessed_emotion = guess.emotion.clone();
    }
    _ => {
      lines.push(ScoreLine { label: "Theme", points: points(result.theme_score, HARD_DIMENSION_CAP), cap: HARD_DIMENSION_CAP });
      lines.push(ScoreLine { label: "Emotion", points: points(result.emotion_score, HARD_DIMENSION_CAP), cap: HARD_DIMENSION_CAP });
      guessed_theme = guess.theme.clone();
      guessed_emotion = guess.emotion.clone();
    }
  }
  lines.push(ScoreLine { label: "Creativity", points: points(result.creativity_score, CREATIVITY_CAP), cap: CREATIVITY_CAP });

  let total = match result.total_score {
    Some(t) if t.is_finite() => t.max(0.0).round() as u64,
    _ => lines.iter().map(|l| l.points).sum(),
  };

  ScoreReport {
    lines,
    total,
    feedback: result.feedback.clone(),
    guessed_theme,
    guessed_emotion,
    confidence_pct: (guess.confidence() * 100.0).round() as u32,
    scored_locally: result.origin == ScoreOrigin::Local,
  }
}

impl fmt::Display for ScoreReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for l in &self.lines {
      writeln!(f, "{:<11} {}/{}", l.label, l.points, l.cap)?;
    }
    writeln!(f, "{:<11} {}/100", "Total", self.total)?;
    if let Some(t) = &self.guessed_theme {
      writeln!(f, "Guessed theme:   {}", t)?;
    }
    if let Some(e) = &self.guessed_emotion {
      writeln!(f, "Guessed emotion: {}", e)?;
    }
    writeln!(f, "Confidence:      {}%", self.confidence_pct)?;
    write!(f, "Feedback:        {}", self.feedback)?;
    if self.scored_locally {
      write!(f, "\n(scored offline)")?;
    }
    Ok(())
  }
}

// ---------- Word bank ----------

/// Required words not found in the poem. Case-insensitive substring match
/// over the whole text, so "art" is satisfied by "heart".
pub fn missing_words(poem: &str, required: &[String]) -> Vec<String> {
  let haystack = poem.to_lowercase();
  required.iter().filter(|w| !haystack.contains(&w.to_lowercase())).cloned().collect()
}

pub fn word_bank_status(poem: &str, required: &[String]) -> String {
  if poem.trim().is_empty() {
    return "Write a poem first".to_string();
  }
  let missing = missing_words(poem, required);
  let used = required.len() - missing.len();
  if missing.is_empty() {
    format!("All required words included! ({}/{} used)", used, required.len())
  } else {
    format!("Missing words: {} ({}/{} used)", missing.join(", "), used, required.len())
  }
}

// ---------- Pipeline ----------

pub struct ScoringPipeline<A, Sc> {
  analyzer: A,
  scorer: Sc,
  local_guesser: LocalGuesser,
  local_scorer: LocalFallbackScorer,
  allow_local_in_daily: bool,
}

impl<A: Analyzer, Sc: Scorer> ScoringPipeline<A, Sc> {
  pub fn new(analyzer: A, scorer: Sc, local_guesser: LocalGuesser, local_scorer: LocalFallbackScorer) -> Self {
    Self { analyzer, scorer, local_guesser, local_scorer, allow_local_in_daily: false }
  }

  /// Permit offline scores for daily submissions. Off by default.
  pub fn allow_local_in_daily(mut self, allow: bool) -> Self {
    self.allow_local_in_daily = allow;
    self
  }

  /// Always yields a guess.
  #[instrument(level = "info", skip(self, poem), fields(difficulty = %difficulty.as_str(), ?focus))]
  pub async fn analyze(&self, poem: &str, difficulty: Difficulty, focus: Option<Focus>) -> Guess {
    match self.analyzer.analyze(poem, difficulty, focus).await {
      Ok(g) => g,
      Err(e) => {
        warn!(target: "scoring", error = %e, "Analyzer unavailable; guessing locally");
        self.local_guesser.guess(difficulty, focus)
      }
    }
  }

  /// Remote score, or the local heuristic when allowed for `play_mode`.
  #[instrument(level = "info", skip(self, req), fields(difficulty = %req.difficulty.as_str(), ?play_mode))]
  pub async fn score(&self, req: &ScoreRequest<'_>, play_mode: PlayMode) -> Result<ScoreResult, ClientError> {
    match self.scorer.score(req).await {
      Ok(r) => Ok(r),
      Err(e) if !e.is_recoverable() => Err(e),
      Err(e) if play_mode.is_daily() && !self.allow_local_in_daily => {
        warn!(target: "scoring", error = %e, "Scorer unavailable; daily submissions need a server score");
        Err(e)
      }
      Err(e) => {
        info!(target: "scoring", error = %e, "Scorer unavailable; scoring locally");
        Ok(self.local_scorer.score_locally(req))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ChallengeOrigin;
  use chrono::NaiveDate;

  fn challenge() -> Challenge {
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    Challenge::new("Adventure", "Excitement", vec!["mountain".into(), "journey".into()], d, ChallengeOrigin::Remote).unwrap()
  }

  fn guess(theme: Option<&str>, emotion: Option<&str>) -> Guess {
    Guess { theme: theme.map(Into::into), emotion: emotion.map(Into::into), confidence: 0.8, origin: GuessOrigin::Remote }
  }

  struct Down;

  impl Analyzer for Down {
    async fn analyze(&self, _: &str, _: Difficulty, _: Option<Focus>) -> Result<Guess, ClientError> {
      Err(ClientError::Network("connection refused".into()))
    }
  }

  impl Scorer for Down {
    async fn score(&self, _: &ScoreRequest<'_>) -> Result<ScoreResult, ClientError> {
      Err(ClientError::Network("connection refused".into()))
    }
  }

  fn offline_pipeline() -> ScoringPipeline<Down, Down> {
    ScoringPipeline::new(
      Down,
      Down,
      LocalGuesser::seeded(FallbackTable::builtin(), 1),
      LocalFallbackScorer::seeded(builtin_feedback_templates(), 1),
    )
  }

  #[test]
  fn identical_strings_match_fully() {
    assert_eq!(calculate_match("Adventure", "Adventure"), 1.0);
    assert_eq!(calculate_match("adventure", "ADVENTURE"), 1.0);
  }

  #[test]
  fn partial_and_empty_matches() {
    assert_eq!(calculate_match("Lost Love", "Love"), 0.5);
    assert_eq!(calculate_match("Hope", "Despair"), 0.0);
    assert_eq!(calculate_match("Hope", ""), 0.0);
  }

  #[test]
  fn exact_guess_earns_the_dimension_cap() {
    let c = challenge();
    let g = guess(Some("Adventure"), Some("Excitement"));
    let scorer = LocalFallbackScorer::seeded(builtin_feedback_templates(), 9);

    let easy = ScoreRequest { poem: "x", challenge: &c, guess: &g, difficulty: Difficulty::Easy, focus: Some(Focus::Theme) };
    let r = scorer.score_locally(&easy);
    assert_eq!(r.theme_score, Some(80.0));
    assert_eq!(r.emotion_score, None);

    let hard = ScoreRequest { difficulty: Difficulty::Hard, focus: None, ..easy };
    let r = scorer.score_locally(&hard);
    assert_eq!((r.theme_score, r.emotion_score), (Some(40.0), Some(40.0)));
    let creativity = r.creativity_score.unwrap();
    assert!((5.0..25.0).contains(&creativity));
    assert_eq!(r.total_score, None);
  }

  #[test]
  fn local_guess_fills_only_the_focus_in_easy_mode() {
    let g = LocalGuesser::seeded(FallbackTable::builtin(), 4);
    let easy = g.guess(Difficulty::Easy, Some(Focus::Emotion));
    assert!(easy.theme.is_none() && easy.emotion.is_some());
    assert_eq!(easy.confidence, 0.5);
    let hard = g.guess(Difficulty::Hard, None);
    assert!(hard.theme.is_some() && hard.emotion.is_some());
  }

  #[test]
  fn total_prefers_server_value() {
    let g = guess(Some("Love"), Some("Joy"));
    let server = ScoreResult {
      theme_score: Some(30.0),
      emotion_score: Some(20.0),
      creativity_score: Some(10.0),
      total_score: Some(77.0),
      ..Default::default()
    };
    assert_eq!(render(&server, &g, Difficulty::Hard, None).total, 77);

    let no_total = ScoreResult { total_score: None, ..server.clone() };
    assert_eq!(render(&no_total, &g, Difficulty::Hard, None).total, 60);

    let easy = ScoreResult { theme_score: Some(64.0), emotion_score: None, creativity_score: Some(12.0), ..Default::default() };
    let report = render(&easy, &g, Difficulty::Easy, Some(Focus::Theme));
    assert_eq!(report.total, 76);
    assert_eq!(report.lines.len(), 2);
    assert_eq!(report.guessed_emotion, None);
  }

  #[test]
  fn rendered_components_respect_caps() {
    let g = guess(Some("Love"), Some("Joy"));
    let r = ScoreResult { theme_score: Some(55.0), emotion_score: Some(-3.0), creativity_score: Some(24.0), ..Default::default() };
    let report = render(&r, &g, Difficulty::Hard, None);
    let pts: Vec<u64> = report.lines.iter().map(|l| l.points).collect();
    assert_eq!(pts, vec![40, 0, 20]);
    assert_eq!(report.total, 60);
  }

  #[test]
  fn word_bank_checks_substrings() {
    let words = vec!["mountain".to_string(), "journey".to_string()];
    assert!(missing_words("I climbed the mountain on my journey", &words).is_empty());
    assert_eq!(missing_words("I climbed a hill", &words), words);
    assert!(missing_words("my HEART sings", &["art".to_string()]).is_empty());
    assert_eq!(word_bank_status("I climbed a hill", &words), "Missing words: mountain, journey (0/2 used)");
    assert_eq!(word_bank_status("Mountain journey", &words), "All required words included! (2/2 used)");
    assert_eq!(word_bank_status("  ", &words), "Write a poem first");
  }

  #[tokio::test]
  async fn local_strategies_satisfy_the_same_contract() {
    let p = ScoringPipeline::new(
      LocalGuesser::seeded(FallbackTable::builtin(), 5),
      LocalFallbackScorer::seeded(builtin_feedback_templates(), 5),
      LocalGuesser::seeded(FallbackTable::builtin(), 6),
      LocalFallbackScorer::default(),
    );
    let g = p.analyze("poem", Difficulty::Easy, Some(Focus::Theme)).await;
    assert!(g.emotion.is_none());
    let c = challenge();
    let req = ScoreRequest { poem: "poem", challenge: &c, guess: &g, difficulty: Difficulty::Easy, focus: Some(Focus::Theme) };
    let r = p.score(&req, PlayMode::Daily).await.unwrap();
    assert!(r.theme_score.unwrap() <= 80.0);
    assert!(builtin_feedback_templates().contains(&r.feedback));
  }

  #[tokio::test]
  async fn offline_analysis_never_fails() {
    let g = offline_pipeline().analyze("poem", Difficulty::Hard, None).await;
    assert_eq!(g.origin, GuessOrigin::Local);
  }

  #[tokio::test]
  async fn offline_scoring_depends_on_play_mode() {
    let p = offline_pipeline();
    let c = challenge();
    let g = guess(Some("Adventure"), Some("Joy"));
    let req = ScoreRequest { poem: "x", challenge: &c, guess: &g, difficulty: Difficulty::Hard, focus: None };

    let r = p.score(&req, PlayMode::Unlimited).await.unwrap();
    assert_eq!(r.origin, ScoreOrigin::Local);
    assert!(matches!(p.score(&req, PlayMode::Daily).await, Err(ClientError::Network(_))));

    let p = offline_pipeline().allow_local_in_daily(true);
    assert_eq!(p.score(&req, PlayMode::Daily).await.unwrap().origin, ScoreOrigin::Local);
  }
}
