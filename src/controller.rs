//! Top-level game flow: selection state, submit readiness, and the
//! gate → analyze → score → persist → render sequence.

use tracing::{error, info, instrument, warn};

use chrono::NaiveDate;

use crate::challenge::{ChallengeResolver, ChallengeSource, Resolved};
use crate::domain::{Challenge, Difficulty, Focus, FocusSelection, Guess, PlayMode, UserStats};
use crate::error::ClientError;
use crate::gate::{DailyService, SubmissionGate, LOGIN_REQUIRED};
use crate::protocol::{DailySubmitIn, DailySubmitOut, SubmissionMetadata};
use crate::scoring::{missing_words, render, word_bank_status, Analyzer, ScoreReport, ScoreRequest, Scorer, ScoringPipeline};
use crate::session::SessionManager;
use crate::store::LocalStore;
use crate::util::text_to_html;

/// Can the submit control be pressed right now?
#[derive(Clone, Debug, PartialEq)]
pub struct Readiness {
  pub can_submit: bool,
  /// First unmet precondition, if any.
  pub blocked_by: Option<String>,
  pub missing_words: Vec<String>,
  /// Word-bank line; `None` when the word bank is off.
  pub word_bank_status: Option<String>,
}

/// Pure precondition check: content, focus (easy mode), word bank (if on).
pub fn evaluate_readiness(
  poem_text: &str,
  difficulty: Difficulty,
  focus: FocusSelection,
  word_bank_enabled: bool,
  required_words: &[String],
) -> Readiness {
  let has_content = !poem_text.trim().is_empty();
  let focus_ok = match difficulty {
    Difficulty::Easy => focus.single().is_some(),
    Difficulty::Hard => true,
  };
  let (missing, status) = if word_bank_enabled {
    let missing = if has_content { missing_words(poem_text, required_words) } else { Vec::new() };
    (missing, Some(word_bank_status(poem_text, required_words)))
  } else {
    (Vec::new(), None)
  };

  let blocked_by = if !focus_ok {
    Some("Please choose whether to focus on theme or emotion".to_string())
  } else if !has_content {
    Some("Please write a poem before submitting".to_string())
  } else if !missing.is_empty() {
    Some(format!("Missing required words: {}", missing.join(", ")))
  } else {
    None
  };

  Readiness { can_submit: blocked_by.is_none(), blocked_by, missing_words: missing, word_bank_status: status }
}

/// What to offer after results are shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
  /// Unlimited mode: try again or roll a new challenge.
  Unlimited,
  /// Daily mode and today's submission is still open.
  DailyOpen,
  /// Today's submission is recorded; point the player at unlimited mode.
  DailyComplete,
}

impl NextStep {
  pub fn headline(&self) -> &'static str {
    match self {
      NextStep::Unlimited => "Keep writing!",
      NextStep::DailyOpen => "Want another go at today's challenge?",
      NextStep::DailyComplete => "Daily Challenge Complete",
    }
  }

  /// Primary action first.
  pub fn actions(&self) -> &'static [&'static str] {
    match self {
      NextStep::Unlimited => &["Try Again", "New Challenge"],
      NextStep::DailyOpen => &["Try Again", "Try Unlimited Mode"],
      NextStep::DailyComplete => &["Try Unlimited Mode"],
    }
  }
}

#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
  pub report: ScoreReport,
  pub guess: Guess,
  /// Server acknowledgement (daily mode only).
  pub ack: Option<DailySubmitOut>,
  /// Stored stats after the acknowledgement was applied.
  pub stats: Option<UserStats>,
}

pub struct ModeController<A, Sc, D, S> {
  play_mode: PlayMode,
  difficulty: Difficulty,
  focus: FocusSelection,
  word_bank_enabled: bool,
  challenge: Option<Challenge>,
  poem_text: String,
  poem_html: String,
  submitting: bool,
  pipeline: ScoringPipeline<A, Sc>,
  gate: SubmissionGate<D>,
  session: SessionManager<S>,
}

impl<A, Sc, D, S> ModeController<A, Sc, D, S>
where
  A: Analyzer,
  Sc: Scorer,
  D: DailyService,
  S: LocalStore,
{
  /// `play_mode` is fixed for the life of the controller.
  pub fn new(play_mode: PlayMode, pipeline: ScoringPipeline<A, Sc>, gate: SubmissionGate<D>, session: SessionManager<S>) -> Self {
    Self {
      play_mode,
      difficulty: Difficulty::Easy,
      focus: FocusSelection::Unset,
      word_bank_enabled: false,
      challenge: None,
      poem_text: String::new(),
      poem_html: String::new(),
      submitting: false,
      pipeline,
      gate,
      session,
    }
  }

  pub fn play_mode(&self) -> PlayMode {
    self.play_mode
  }

  pub fn difficulty(&self) -> Difficulty {
    self.difficulty
  }

  pub fn focus(&self) -> FocusSelection {
    self.focus
  }

  pub fn challenge(&self) -> Option<&Challenge> {
    self.challenge.as_ref()
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  pub fn session(&self) -> &SessionManager<S> {
    &self.session
  }

  pub fn gate(&self) -> &SubmissionGate<D> {
    &self.gate
  }

  /// Hard mode scores both dimensions. Going back to easy clears the
  /// selection so the player has to choose again.
  pub fn set_difficulty(&mut self, difficulty: Difficulty) {
    self.difficulty = difficulty;
    self.focus = match difficulty {
      Difficulty::Hard => FocusSelection::Both,
      Difficulty::Easy => FocusSelection::Unset,
    };
  }

  pub fn select_focus(&mut self, focus: Focus) -> Result<(), ClientError> {
    if self.difficulty == Difficulty::Hard {
      return Err(ClientError::Validation("Hard mode always scores theme and emotion".into()));
    }
    self.focus = FocusSelection::Single(focus);
    Ok(())
  }

  pub fn set_word_bank(&mut self, enabled: bool) {
    self.word_bank_enabled = enabled;
  }

  /// `html` defaults to an escaped rendition of `text`.
  pub fn set_poem(&mut self, text: impl Into<String>, html: Option<String>) {
    self.poem_text = text.into();
    self.poem_html = html.unwrap_or_else(|| text_to_html(&self.poem_text));
  }

  pub fn set_challenge(&mut self, challenge: Challenge) {
    self.challenge = Some(challenge);
  }

  /// Resolve the active challenge for this controller's mode.
  pub async fn load_challenge<Src, S2>(&mut self, resolver: &mut ChallengeResolver<Src, S2>, today: NaiveDate) -> &Challenge
  where
    Src: ChallengeSource,
    S2: LocalStore,
  {
    let Resolved { challenge, .. } = resolver.resolve(self.play_mode, today).await;
    self.challenge.insert(challenge)
  }

  pub fn readiness(&self) -> Readiness {
    let required = self.challenge.as_ref().map(|c| c.required_words.as_slice()).unwrap_or(&[]);
    let mut r = evaluate_readiness(&self.poem_text, self.difficulty, self.focus, self.word_bank_enabled, required);
    if self.challenge.is_none() {
      r.can_submit = false;
      r.blocked_by.get_or_insert_with(|| "No active challenge".into());
    }
    if self.submitting {
      r.can_submit = false;
    }
    r
  }

  /// Run one submission. The submitting flag is set for the whole attempt
  /// and always cleared afterwards, whatever the outcome.
  #[instrument(level = "info", skip(self), fields(mode = ?self.play_mode, difficulty = %self.difficulty.as_str()))]
  pub async fn submit(&mut self) -> Result<SubmissionOutcome, ClientError> {
    if self.submitting {
      return Err(ClientError::Validation("A submission is already in progress".into()));
    }
    let readiness = self.readiness();
    if let Some(reason) = readiness.blocked_by {
      return Err(ClientError::Validation(reason));
    }
    let challenge = match &self.challenge {
      Some(c) => c.clone(),
      None => return Err(ClientError::Validation("No active challenge".into())),
    };

    self.submitting = true;
    let outcome = self.run_submission(&challenge).await;
    self.submitting = false;

    match &outcome {
      Ok(o) => info!(target: "scoring", total = o.report.total, local = o.report.scored_locally, "Submission scored"),
      Err(e) => warn!(target: "scoring", error = %e, "Submission aborted"),
    }
    outcome
  }

  async fn run_submission(&self, challenge: &Challenge) -> Result<SubmissionOutcome, ClientError> {
    let token = if self.play_mode.is_daily() { self.session.token() } else { None };

    // Re-check right before scoring; the day may have been used up elsewhere.
    if self.play_mode.is_daily() {
      let e = self.gate.check_eligibility(token.as_deref()).await;
      if !e.can_submit {
        return Err(ClientError::Ineligible {
          reason: e.reason.unwrap_or_else(|| LOGIN_REQUIRED.into()),
          previous_score: e.previous_score,
        });
      }
    }

    let focus = match self.difficulty {
      Difficulty::Easy => self.focus.single(),
      Difficulty::Hard => None,
    };
    let guess = self.pipeline.analyze(&self.poem_text, self.difficulty, focus).await;
    let req = ScoreRequest { poem: &self.poem_text, challenge, guess: &guess, difficulty: self.difficulty, focus };
    let result = self.pipeline.score(&req, self.play_mode).await?;
    let report = render(&result, &guess, self.difficulty, focus);

    let (ack, stats) = match (self.play_mode, token) {
      (PlayMode::Daily, Some(token)) => {
        let body = DailySubmitIn {
          score: report.total,
          metadata: SubmissionMetadata {
            mode: self.difficulty,
            easy_selection: focus,
            word_bank_used: self.word_bank_enabled,
            theme: challenge.theme.clone(),
            emotion: challenge.emotion.clone(),
            required_words: challenge.required_words.clone(),
            poem_text: self.poem_text.clone(),
            poem_html: self.poem_html.clone(),
            ai_guess: guess.clone(),
            scored_locally: report.scored_locally,
          },
        };
        let ack = self.gate.service().submit_daily(&token, &body).await.map_err(|e| {
          error!(target: "scoring", error = %e, "Failed to save daily score");
          e
        })?;
        let stats = match self.session.apply_submission_ack(report.total, &ack) {
          Ok(s) => s,
          Err(e) => {
            warn!(target: "session", error = %e, "Score saved but local stats could not be updated");
            None
          }
        };
        (Some(ack), stats)
      }
      (PlayMode::Daily, None) => return Err(ClientError::Auth(LOGIN_REQUIRED.into())),
      (PlayMode::Unlimited, _) => (None, None),
    };

    Ok(SubmissionOutcome { report, guess, ack, stats })
  }

  /// Suggestion shown with the results.
  pub async fn next_step(&self) -> NextStep {
    if !self.play_mode.is_daily() {
      return NextStep::Unlimited;
    }
    let token = self.session.token();
    if self.gate.check_eligibility(token.as_deref()).await.can_submit {
      NextStep::DailyOpen
    } else {
      NextStep::DailyComplete
    }
  }
}
