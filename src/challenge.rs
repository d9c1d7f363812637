//! Active-challenge resolution.
//!
//! Daily mode:
//!   CHECK_CACHE → (record for today) USE_CACHED
//!   CHECK_CACHE → (miss / stale / corrupt) GENERATE → save → USE_FRESH
//! Unlimited mode:
//!   GENERATE → USE_FRESH, never touching the cache.
//! Daily terminals notify the archiver (fire-and-forget).
//!
//! GENERATE makes exactly one remote attempt; any failure picks a row from the
//! local fallback table, which always succeeds.

use std::future::Future;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, instrument, warn};

use crate::api::ApiClient;
use crate::archive::ChallengeArchiver;
use crate::cache::{date_key, ChallengeCache};
use crate::domain::{Challenge, ChallengeOrigin, PlayMode};
use crate::error::ClientError;
use crate::protocol::ChallengeWire;
use crate::seeds::FallbackTable;
use crate::store::LocalStore;

/// Remote generator of today's {theme, emotion, words}.
pub trait ChallengeSource: Send + Sync {
  fn fetch_challenge(&self) -> impl Future<Output = Result<ChallengeWire, ClientError>> + Send;
}

impl ChallengeSource for ApiClient {
  async fn fetch_challenge(&self) -> Result<ChallengeWire, ClientError> {
    ApiClient::fetch_challenge(self).await
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveState {
  CheckCache,
  Generate,
  UseCached,
  UseFresh,
}

#[derive(Clone, Debug)]
pub struct Resolved {
  pub challenge: Challenge,
  /// Terminal state reached: `UseCached` or `UseFresh`.
  pub path: ResolveState,
}

pub struct ChallengeResolver<Src, S> {
  source: Src,
  cache: ChallengeCache<S>,
  archiver: ChallengeArchiver,
  fallback: FallbackTable,
  rng: StdRng,
}

impl<Src: ChallengeSource, S: LocalStore> ChallengeResolver<Src, S> {
  pub fn new(source: Src, store: S, archiver: ChallengeArchiver, fallback: FallbackTable) -> Self {
    Self { source, cache: ChallengeCache::new(store), archiver, fallback, rng: StdRng::from_entropy() }
  }

  /// Deterministic fallback picks (tests).
  pub fn with_rng(mut self, rng: StdRng) -> Self {
    self.rng = rng;
    self
  }

  pub fn cache(&self) -> &ChallengeCache<S> {
    &self.cache
  }

  #[instrument(level = "info", skip(self))]
  pub async fn resolve(&mut self, mode: PlayMode, today: NaiveDate) -> Resolved {
    let mut state = if mode.is_daily() { ResolveState::CheckCache } else { ResolveState::Generate };
    let mut active: Option<Challenge> = None;

    loop {
      match state {
        ResolveState::CheckCache => match self.cache.load_for(today) {
          Some(cached) => {
            info!(target: "challenge", date = %date_key(today), theme = %cached.theme, emotion = %cached.emotion, "Using cached daily challenge");
            active = Some(cached);
            state = ResolveState::UseCached;
          }
          None => state = ResolveState::Generate,
        },
        ResolveState::Generate => {
          let fresh = self.generate(today).await;
          if mode.is_daily() {
            if let Err(e) = self.cache.save(today, &fresh) {
              error!(target: "challenge", error = %e, "Could not cache today's challenge");
            }
          }
          active = Some(fresh);
          state = ResolveState::UseFresh;
        }
        ResolveState::UseCached | ResolveState::UseFresh => {
          let challenge = match active.take() {
            Some(c) => c,
            None => {
              state = ResolveState::Generate;
              continue;
            }
          };
          if mode.is_daily() {
            self.archiver.track(&challenge);
          }
          return Resolved { challenge, path: state };
        }
      }
    }
  }

  /// Drop today's cached record and generate a replacement.
  #[instrument(level = "info", skip(self))]
  pub async fn force_new(&mut self, mode: PlayMode, today: NaiveDate) -> Resolved {
    if let Err(e) = self.cache.clear() {
      warn!(target: "challenge", error = %e, "Could not clear cached challenge");
    }
    let fresh = self.generate(today).await;
    if mode.is_daily() {
      if let Err(e) = self.cache.save(today, &fresh) {
        error!(target: "challenge", error = %e, "Could not cache forced challenge");
      }
      self.archiver.track(&fresh);
    }
    Resolved { challenge: fresh, path: ResolveState::UseFresh }
  }

  /// One remote attempt, then the local table.
  async fn generate(&mut self, today: NaiveDate) -> Challenge {
    let remote = self
      .source
      .fetch_challenge()
      .await
      .and_then(|wire| wire.into_challenge(today, ChallengeOrigin::Remote));
    match remote {
      Ok(c) => {
        info!(target: "challenge", theme = %c.theme, emotion = %c.emotion, words = c.required_words.len(), "Fetched fresh challenge");
        c
      }
      Err(e) => {
        warn!(target: "challenge", error = %e, "Challenge service unavailable; using fallback table");
        self.fallback_challenge(today)
      }
    }
  }

  pub fn fallback_challenge(&mut self, today: NaiveDate) -> Challenge {
    let row = self.fallback.pick(&mut self.rng);
    Challenge {
      theme: row.theme,
      emotion: row.emotion,
      required_words: row.words.into_iter().filter(|w| !w.trim().is_empty()).collect(),
      issued_date: today,
      origin: ChallengeOrigin::Fallback,
    }
  }
}
