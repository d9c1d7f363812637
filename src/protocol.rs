//! Wire structs for the game backend's HTTP/JSON endpoints (serde ready).
//! Field names follow the server exactly; conversion into domain types lives here too.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, ChallengeOrigin, Difficulty, Focus, Guess, ScoreResult, UserStats};
use crate::error::ClientError;
use crate::util::lenient_score;

/// `{theme, emotion, words}`: the challenge body of `/api/challenge`, the
/// `/api/archive/track` request, and (plus `date`) the cached record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeWire {
    pub theme: String,
    pub emotion: String,
    pub words: Vec<String>,
}

impl ChallengeWire {
    pub fn into_challenge(self, issued: NaiveDate, origin: ChallengeOrigin) -> Result<Challenge, ClientError> {
        Challenge::new(self.theme, self.emotion, self.words, issued, origin)
    }
}

impl From<&Challenge> for ChallengeWire {
    fn from(c: &Challenge) -> Self {
        Self { theme: c.theme.clone(), emotion: c.emotion.clone(), words: c.required_words.clone() }
    }
}

/// `GET /api/challenge`
#[derive(Debug, Deserialize)]
pub struct ChallengeOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub challenge: Option<ChallengeWire>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Generic `{success, error?, message?}` acknowledgement.
#[derive(Debug, Default, Deserialize)]
pub struct AckOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AckOut {
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown error".into())
    }
}

/// `{success, result, error?}` envelope used by analyze and score.
#[derive(Debug, Deserialize)]
pub struct ResultOut<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /api/analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeIn<'a> {
    pub poem: &'a str,
    pub mode: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Focus>,
}

/// `POST /api/score`
#[derive(Debug, Serialize)]
pub struct ScoreIn<'a> {
    pub poem: &'a str,
    pub intended_theme: &'a str,
    pub intended_emotion: &'a str,
    pub ai_guess: &'a Guess,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Focus>,
}

pub type AnalyzeOut = ResultOut<Guess>;
pub type ScoreOut = ResultOut<ScoreResult>;

/// `GET /api/daily/submission-status`
#[derive(Debug, Deserialize)]
pub struct SubmissionStatusOut {
    #[serde(default)]
    pub can_submit: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub daily_score: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything the server records about one daily submission besides the score.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionMetadata {
    pub mode: Difficulty,
    pub easy_selection: Option<Focus>,
    pub word_bank_used: bool,
    pub theme: String,
    pub emotion: String,
    pub required_words: Vec<String>,
    pub poem_text: String,
    pub poem_html: String,
    pub ai_guess: Guess,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scored_locally: bool,
}

/// `POST /api/daily/submit`
#[derive(Clone, Debug, Serialize)]
pub struct DailySubmitIn {
    pub score: u64,
    #[serde(flatten)]
    pub metadata: SubmissionMetadata,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DailySubmitOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub total_score: Option<u64>,
    #[serde(default)]
    pub best_score: Option<u64>,
    #[serde(default)]
    pub daily_score: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginIn<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterIn<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Login/register response.
#[derive(Debug, Deserialize)]
pub struct AuthOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserStats>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/auth/verify`
#[derive(Debug, Deserialize)]
pub struct VerifyOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserStats>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DailyScoreEntry {
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub submitted: bool,
}

/// `GET /api/daily/history`
#[derive(Clone, Debug, Deserialize)]
pub struct DailyHistoryOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub daily_scores: BTreeMap<String, DailyScoreEntry>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_daily_score: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// One stored daily submission, as listed by the submission history.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmissionRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub mode: Option<Difficulty>,
    #[serde(default)]
    pub easy_selection: Option<Focus>,
    #[serde(default)]
    pub word_bank_used: bool,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub poem_text: String,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// `GET /api/user/submission-history`
#[derive(Clone, Debug, Deserialize)]
pub struct SubmissionHistoryOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub submissions: BTreeMap<String, SubmissionRecord>,
    #[serde(default)]
    pub total_submissions: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// A challenge as kept by the server-side archive.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ArchivedChallenge {
    pub date: String,
    pub theme: String,
    pub emotion: String,
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub submissions_count: u64,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub best_score: u64,
}

/// `GET /api/archive/challenges` (keyed by `YYYY-MM-DD`)
#[derive(Debug, Deserialize)]
pub struct ArchiveListOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub challenges: BTreeMap<String, ArchivedChallenge>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/archive/challenge/<date>`
#[derive(Debug, Deserialize)]
pub struct ArchiveEntryOut {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub challenge: Option<ArchivedChallenge>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analyze_request_omits_focus_in_hard_mode() {
        let hard = serde_json::to_value(AnalyzeIn { poem: "p", mode: Difficulty::Hard, focus: None }).unwrap();
        assert_eq!(hard, json!({"poem": "p", "mode": "hard"}));
        let easy = serde_json::to_value(AnalyzeIn { poem: "p", mode: Difficulty::Easy, focus: Some(Focus::Theme) }).unwrap();
        assert_eq!(easy, json!({"poem": "p", "mode": "easy", "focus": "theme"}));
    }

    #[test]
    fn daily_submit_flattens_metadata() {
        let guess = Guess { theme: Some("Love".into()), emotion: None, confidence: 0.8, origin: Default::default() };
        let body = DailySubmitIn {
            score: 77,
            metadata: SubmissionMetadata {
                mode: Difficulty::Easy,
                easy_selection: Some(Focus::Theme),
                word_bank_used: true,
                theme: "Love".into(),
                emotion: "Joy".into(),
                required_words: vec!["heart".into()],
                poem_text: "my heart".into(),
                poem_html: "my heart".into(),
                ai_guess: guess,
                scored_locally: false,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["score"], 77);
        assert_eq!(v["easy_selection"], "theme");
        assert_eq!(v["ai_guess"]["theme"], "Love");
        assert!(v.get("scored_locally").is_none());
        assert!(v.get("metadata").is_none());
    }

    #[test]
    fn status_tolerates_error_shape() {
        let s: SubmissionStatusOut = serde_json::from_str(r#"{"success": false, "error": "Invalid token"}"#).unwrap();
        assert!(!s.can_submit);
        assert_eq!(s.error.as_deref(), Some("Invalid token"));
    }
}
