//! Daily challenge cache, keyed by calendar-day string.
//!
//! The stored record is `{date, theme, emotion, words}` under
//! `stanzle_daily_challenge`. Anything unreadable is a cache miss.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Challenge, ChallengeOrigin};
use crate::error::ClientError;
use crate::store::{LocalStore, DAILY_CHALLENGE_KEY};

const DATE_KEY_FORMAT: &str = "%a %b %d %Y";

/// Calendar-day key, e.g. `Mon Jan 01 2024`.
pub fn date_key(date: NaiveDate) -> String {
  date.format(DATE_KEY_FORMAT).to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct CachedChallengeRecord {
  pub date: String,
  pub challenge: Challenge,
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
  date: String,
  theme: String,
  emotion: String,
  words: Vec<String>,
}

pub struct ChallengeCache<S> {
  store: S,
}

impl<S: LocalStore> ChallengeCache<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  /// Overwrite the record with `challenge` for `date`.
  pub fn save(&self, date: NaiveDate, challenge: &Challenge) -> Result<(), ClientError> {
    let record = StoredRecord {
      date: date_key(date),
      theme: challenge.theme.clone(),
      emotion: challenge.emotion.clone(),
      words: challenge.required_words.clone(),
    };
    let json = serde_json::to_string(&record).map_err(|e| ClientError::Storage(e.to_string()))?;
    self.store.set(DAILY_CHALLENGE_KEY, &json)?;
    debug!(target: "challenge", date = %record.date, theme = %record.theme, "Saved daily challenge");
    Ok(())
  }

  /// `None` when absent, unreadable, malformed, or failing challenge validation.
  pub fn load(&self) -> Option<CachedChallengeRecord> {
    let raw = match self.store.get(DAILY_CHALLENGE_KEY) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(target: "challenge", error = %e, "Could not read cached challenge; treating as miss");
        return None;
      }
    };
    let stored = match serde_json::from_str::<StoredRecord>(&raw) {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "challenge", error = %e, "Cached challenge is malformed; treating as miss");
        return None;
      }
    };
    let issued = match NaiveDate::parse_from_str(&stored.date, DATE_KEY_FORMAT) {
      Ok(d) => d,
      Err(e) => {
        warn!(target: "challenge", date = %stored.date, error = %e, "Cached challenge has an unreadable date; treating as miss");
        return None;
      }
    };
    match Challenge::new(stored.theme, stored.emotion, stored.words, issued, ChallengeOrigin::Cached) {
      Ok(challenge) => Some(CachedChallengeRecord { date: stored.date, challenge }),
      Err(e) => {
        warn!(target: "challenge", error = %e, "Cached challenge failed validation; treating as miss");
        None
      }
    }
  }

  /// Cached record for `today` only.
  pub fn load_for(&self, today: NaiveDate) -> Option<Challenge> {
    self.load().filter(|r| r.date == date_key(today)).map(|r| r.challenge)
  }

  pub fn clear(&self) -> Result<(), ClientError> {
    self.store.remove(DAILY_CHALLENGE_KEY)
  }
}
