//! Stanzle · daily writing-prompt game client
//!
//! Usage:
//!   stanzle [daily|unlimited] [--easy theme|emotion | --hard] [--word-bank] <poem-file>
//!   stanzle new                        : replace today's cached daily challenge
//!   stanzle login <user> <password>
//!   stanzle register <user> <email> <password>
//!   stanzle logout
//!   stanzle status                     : account + today's daily badge
//!   stanzle history                    : daily scores and past submissions
//!   stanzle archive [YYYY-MM-DD]       : archived challenges
//!
//! Important env variables:
//!   STANZLE_API_URL      : backend base URL (default "http://127.0.0.1:5000")
//!   STANZLE_DATA_DIR     : local storage directory (default ".stanzle")
//!   STANZLE_TIMEOUT_SECS : per-request timeout (default 20)
//!   STANZLE_CONFIG_PATH  : path to TOML config (fallback table, feedback templates)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use stanzle_client::api::ApiClient;
use stanzle_client::archive::ChallengeArchiver;
use stanzle_client::challenge::ChallengeResolver;
use stanzle_client::config::ClientConfig;
use stanzle_client::controller::ModeController;
use stanzle_client::domain::{Challenge, Difficulty, Focus, PlayMode};
use stanzle_client::error::ClientError;
use stanzle_client::gate::{DailyStatus, SubmissionGate};
use stanzle_client::scoring::{LocalFallbackScorer, LocalGuesser, ScoringPipeline};
use stanzle_client::session::SessionManager;
use stanzle_client::store::{FileStore, LocalStore};
use stanzle_client::telemetry;

const ARCHIVE_GRACE: Duration = Duration::from_secs(3);

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
  match args.iter().position(|a| a == flag) {
    Some(i) => {
      args.remove(i);
      true
    }
    None => false,
  }
}

fn take_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, ClientError> {
  let Some(i) = args.iter().position(|a| a == flag) else { return Ok(None) };
  if i + 1 >= args.len() {
    return Err(ClientError::Validation(format!("{} needs a value", flag)));
  }
  let value = args.remove(i + 1);
  args.remove(i);
  Ok(Some(value))
}

fn today() -> NaiveDate {
  chrono::Local::now().date_naive()
}

fn print_challenge(c: &Challenge) {
  println!("Theme:   {}", c.theme);
  println!("Emotion: {}", c.emotion);
  println!("Words:   {}", c.required_words.join(", "));
}

/// Account line plus the daily badge. A failed verify still reports the badge.
async fn status_report<S: LocalStore>(session: &SessionManager<S>, api: &ApiClient) -> Vec<String> {
  let account = match session.verify(api).await {
    Ok(Some(user)) => format!(
      "{}: {} games played, best {}, total {}",
      user.username, user.games_played, user.best_score, user.total_score
    ),
    Ok(None) => "Not logged in".to_string(),
    Err(e) => {
      warn!(target: "session", error = %e, "Could not verify the session");
      format!("Account: unavailable ({})", e)
    }
  };
  let gate = SubmissionGate::new(api.clone());
  let badge = match gate.daily_status(session.token().as_deref()).await {
    DailyStatus::Ready => "Daily challenge: Ready".to_string(),
    DailyStatus::Submitted { daily_score: Some(s) } => format!("Daily challenge: Submitted (score {})", s),
    DailyStatus::Submitted { daily_score: None } => "Daily challenge: Submitted".to_string(),
    DailyStatus::Unavailable { reason } => format!("Daily challenge: {}", reason),
  };
  vec![account, badge]
}

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = ClientConfig::load();
  let store = Arc::new(FileStore::open(cfg.storage_path())?);
  let api = ApiClient::from_config(&cfg)?;
  let session = SessionManager::new(store.clone());

  let mut argv = std::env::args();
  let program = argv.next().unwrap_or_default();
  let mut args: Vec<String> = argv.collect();

  match args.first().map(String::as_str) {
    Some("login") => {
      let (Some(user), Some(password)) = (args.get(1), args.get(2)) else {
        return Err(ClientError::Validation("usage: stanzle login <user> <password>".into()).into());
      };
      let state = session.login(&api, user, password).await?;
      println!("Logged in as {} ({} games, best {})", state.user.username, state.user.games_played, state.user.best_score);
      return Ok(());
    }
    Some("register") => {
      let (Some(user), Some(email), Some(password)) = (args.get(1), args.get(2), args.get(3)) else {
        return Err(ClientError::Validation("usage: stanzle register <user> <email> <password>".into()).into());
      };
      println!("{}", session.register(&api, user, email, password).await?);
      return Ok(());
    }
    Some("logout") => {
      session.logout(&api).await?;
      println!("Logged out");
      return Ok(());
    }
    Some("status") => {
      for line in status_report(&session, &api).await {
        println!("{}", line);
      }
      return Ok(());
    }
    Some("history") => {
      let token = session.token().ok_or_else(|| ClientError::Auth("Please log in to view history".into()))?;
      let daily = api.daily_history(&token).await?;
      println!("Current streak: {}  Best daily score: {}", daily.current_streak, daily.best_daily_score);
      for (date, entry) in &daily.daily_scores {
        println!("  {}  {:>3}{}", date, entry.score, if entry.submitted { "" } else { " (not submitted)" });
      }
      let subs = api.submission_history(&token).await?;
      println!("Submissions: {}", subs.total_submissions);
      for (date, s) in &subs.submissions {
        println!("  {}  {:>3}  {} / {}", date, s.score, s.theme, s.emotion);
      }
      return Ok(());
    }
    Some("archive") => {
      match args.get(1) {
        Some(raw) => {
          let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| ClientError::Validation(format!("bad date {}: {}", raw, e)))?;
          match api.archive_challenge(date).await? {
            Some(a) => println!("{}  {} / {}  [{}]  {} plays, avg {:.1}, best {}", a.date, a.theme, a.emotion, a.words.join(", "), a.submissions_count, a.avg_score, a.best_score),
            None => println!("No archived challenge for {}", date),
          }
        }
        None => {
          for a in api.archive_challenges().await? {
            println!("{}  {} / {}  ({} plays)", a.date, a.theme, a.emotion, a.submissions_count);
          }
        }
      }
      return Ok(());
    }
    Some("new") => {
      let (archiver, worker) = ChallengeArchiver::spawn(api.clone());
      let mut resolver = ChallengeResolver::new(api.clone(), store.clone(), archiver, cfg.fallback_table());
      let resolved = resolver.force_new(PlayMode::Daily, today()).await;
      print_challenge(&resolved.challenge);
      drop(resolver);
      worker.close(ARCHIVE_GRACE).await;
      return Ok(());
    }
    _ => {}
  }

  // Play: mode from the first argument, else from how we were launched.
  let play_mode = match args.first().map(String::as_str) {
    Some("daily") => {
      args.remove(0);
      PlayMode::Daily
    }
    Some("unlimited") => {
      args.remove(0);
      PlayMode::Unlimited
    }
    _ => PlayMode::detect(&program),
  };
  let hard = take_flag(&mut args, "--hard");
  let easy = take_value(&mut args, "--easy")?;
  let word_bank = take_flag(&mut args, "--word-bank");
  let poem_path = args
    .pop()
    .ok_or_else(|| ClientError::Validation("usage: stanzle [daily|unlimited] [--easy theme|emotion | --hard] [--word-bank] <poem-file>".into()))?;
  let poem = std::fs::read_to_string(&poem_path)?;

  let (archiver, worker) = ChallengeArchiver::spawn(api.clone());
  let mut resolver = ChallengeResolver::new(api.clone(), store.clone(), archiver, cfg.fallback_table());
  let table = cfg.fallback_table();
  let pipeline = ScoringPipeline::new(
    api.clone(),
    api.clone(),
    LocalGuesser::new(table),
    LocalFallbackScorer::new(cfg.feedback_templates()),
  )
  .allow_local_in_daily(cfg.allow_local_scoring_in_daily);
  let mut controller = ModeController::new(play_mode, pipeline, SubmissionGate::new(api.clone()), session);

  print_challenge(controller.load_challenge(&mut resolver, today()).await);
  drop(resolver);
  info!(target: "stanzle", mode = ?play_mode, "Challenge ready");

  if hard {
    controller.set_difficulty(Difficulty::Hard);
  } else {
    controller.set_difficulty(Difficulty::Easy);
    if let Some(raw) = easy {
      let focus = Focus::parse(&raw).ok_or_else(|| ClientError::Validation(format!("unknown focus: {}", raw)))?;
      controller.select_focus(focus)?;
    }
  }
  controller.set_word_bank(word_bank);
  controller.set_poem(poem, None);

  let readiness = controller.readiness();
  if let Some(status) = &readiness.word_bank_status {
    println!("{}", status);
  }

  let result = controller.submit().await;
  let outcome = match result {
    Ok(o) => o,
    Err(e) => {
      worker.close(ARCHIVE_GRACE).await;
      return Err(e.into());
    }
  };
  println!();
  println!("{}", outcome.report);
  if let Some(stats) = &outcome.stats {
    println!("{}: {} games, best {}, total {}", stats.username, stats.games_played, stats.best_score, stats.total_score);
  }
  let next = controller.next_step().await;
  println!();
  println!("{} [{}]", next.headline(), next.actions().join(" | "));

  worker.close(ARCHIVE_GRACE).await;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use stanzle_client::domain::UserStats;
  use stanzle_client::gate::STATUS_CHECK_FAILED;
  use stanzle_client::store::MemoryStore;

  #[tokio::test]
  async fn status_still_shows_the_badge_when_verify_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let api = ApiClient::new(&url, Duration::from_secs(2)).unwrap();
    let session = SessionManager::new(MemoryStore::new());
    session.save("tok-offline", &UserStats { username: "ash".into(), ..Default::default() }).unwrap();

    let lines = status_report(&session, &api).await;
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Account: unavailable"));
    assert_eq!(lines[1], format!("Daily challenge: {}", STATUS_CHECK_FAILED));
    assert!(session.token().is_some());
  }
}
