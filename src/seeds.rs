//! Built-in content that keeps the game playable without a backend:
//! the fallback challenge table and the encouraging feedback lines.

use rand::seq::SliceRandom;
use rand::Rng;

const THEMES: [&str; 8] = ["Adventure", "Love", "Nature", "Dreams", "Time", "Hope", "Loss", "Freedom"];

const EMOTIONS: [&str; 8] = ["Joy", "Sadness", "Anger", "Fear", "Surprise", "Peace", "Excitement", "Nostalgia"];

const WORD_BANKS: [[&str; 4]; 8] = [
  ["mountain", "journey", "discover", "freedom"],
  ["heart", "soul", "passion", "forever"],
  ["tree", "wind", "ocean", "sky"],
  ["sleep", "dream", "reality", "awake"],
  ["clock", "moment", "eternity", "now"],
  ["light", "dark", "shine", "bright"],
  ["tear", "smile", "memory", "goodbye"],
  ["bird", "cage", "fly", "free"],
];

const FEEDBACK_TEMPLATES: [&str; 5] = [
  "Your poem beautifully captures the essence of the challenge!",
  "Great work! The imagery really brings the theme to life.",
  "Wonderful creativity! Your unique perspective shines through.",
  "Excellent use of language and emotion in your piece.",
  "Your poem demonstrates great understanding of the theme.",
];

/// Parallel tables: row `i` of themes, emotions and word banks belong together.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackTable {
  themes: Vec<String>,
  emotions: Vec<String>,
  word_banks: Vec<Vec<String>>,
}

/// One row of the fallback table.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackEntry {
  pub theme: String,
  pub emotion: String,
  pub words: Vec<String>,
}

impl FallbackTable {
  pub fn builtin() -> Self {
    Self {
      themes: THEMES.iter().map(|s| s.to_string()).collect(),
      emotions: EMOTIONS.iter().map(|s| s.to_string()).collect(),
      word_banks: WORD_BANKS.iter().map(|b| b.iter().map(|s| s.to_string()).collect()).collect(),
    }
  }

  /// Validated custom table: equal non-zero lengths, no blank prompt, no empty bank.
  pub fn from_parts(themes: Vec<String>, emotions: Vec<String>, word_banks: Vec<Vec<String>>) -> Result<Self, String> {
    if themes.is_empty() {
      return Err("fallback table is empty".into());
    }
    if themes.len() != emotions.len() || themes.len() != word_banks.len() {
      return Err(format!(
        "fallback table rows are not paired (themes={}, emotions={}, word_banks={})",
        themes.len(),
        emotions.len(),
        word_banks.len()
      ));
    }
    if themes.iter().chain(emotions.iter()).any(|s| s.trim().is_empty()) {
      return Err("fallback table contains a blank theme or emotion".into());
    }
    if word_banks.iter().any(|b| b.iter().all(|w| w.trim().is_empty())) {
      return Err("fallback table contains an empty word bank".into());
    }
    Ok(Self { themes, emotions, word_banks })
  }

  pub fn len(&self) -> usize {
    self.themes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.themes.is_empty()
  }

  pub fn entry(&self, index: usize) -> Option<FallbackEntry> {
    Some(FallbackEntry {
      theme: self.themes.get(index)?.clone(),
      emotion: self.emotions.get(index)?.clone(),
      words: self.word_banks.get(index)?.clone(),
    })
  }

  /// One shared random index for all three columns.
  pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> FallbackEntry {
    let index = rng.gen_range(0..self.len());
    FallbackEntry {
      theme: self.themes[index].clone(),
      emotion: self.emotions[index].clone(),
      words: self.word_banks[index].clone(),
    }
  }

  /// Independent random theme, used by the local guesser.
  pub fn random_theme<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
    self.themes.choose(rng).cloned().unwrap_or_else(|| THEMES[0].to_string())
  }

  pub fn random_emotion<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
    self.emotions.choose(rng).cloned().unwrap_or_else(|| EMOTIONS[0].to_string())
  }
}

impl Default for FallbackTable {
  fn default() -> Self {
    Self::builtin()
  }
}

pub fn builtin_feedback_templates() -> Vec<String> {
  FEEDBACK_TEMPLATES.iter().map(|s| s.to_string()).collect()
}

/// Uniform pick; does not depend on the score.
pub fn pick_feedback<R: Rng + ?Sized>(templates: &[String], rng: &mut R) -> String {
  templates
    .choose(rng)
    .cloned()
    .unwrap_or_else(|| FEEDBACK_TEMPLATES[0].to_string())
}
