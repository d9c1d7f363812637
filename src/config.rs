//! Client configuration: backend location, local data directory, scoring policy
//! and optional overrides of the built-in fallback content.
//!
//! Values come from a TOML file at STANZLE_CONFIG_PATH (optional) and are then
//! overridden by individual environment variables. See `ClientConfig` for the schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::seeds::{builtin_feedback_templates, FallbackTable};

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_DATA_DIR: &str = ".stanzle";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  pub api_base_url: String,
  pub data_dir: PathBuf,
  pub request_timeout_secs: u64,
  /// Whether a daily (persisted) submission may be scored by the local heuristic.
  pub allow_local_scoring_in_daily: bool,
  pub fallback: Option<FallbackCfg>,
  pub feedback_templates: Option<Vec<String>>,
}

/// Replacement fallback table accepted in TOML. Rows are paired by index.
#[derive(Clone, Debug, Deserialize)]
pub struct FallbackCfg {
  pub themes: Vec<String>,
  pub emotions: Vec<String>,
  pub word_banks: Vec<Vec<String>>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base_url: DEFAULT_API_URL.into(),
      data_dir: PathBuf::from(DEFAULT_DATA_DIR),
      request_timeout_secs: DEFAULT_TIMEOUT_SECS,
      allow_local_scoring_in_daily: false,
      fallback: None,
      feedback_templates: None,
    }
  }
}

impl ClientConfig {
  /// TOML file (if any) + env overrides. Never fails: bad input is logged and defaults win.
  pub fn load() -> Self {
    let mut cfg = load_config_from_env_path().unwrap_or_default();
    cfg.apply_env_overrides(|k| std::env::var(k).ok());
    cfg
  }

  /// Overrides from a variable lookup (injected so tests don't touch the process env).
  pub fn apply_env_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
    if let Some(url) = lookup("STANZLE_API_URL").filter(|s| !s.trim().is_empty()) {
      self.api_base_url = url;
    }
    if let Some(dir) = lookup("STANZLE_DATA_DIR").filter(|s| !s.trim().is_empty()) {
      self.data_dir = PathBuf::from(dir);
    }
    if let Some(raw) = lookup("STANZLE_TIMEOUT_SECS") {
      match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
        _ => warn!(target: "stanzle", value = %raw, "Ignoring invalid STANZLE_TIMEOUT_SECS"),
      }
    }
    if let Some(raw) = lookup("STANZLE_ALLOW_LOCAL_DAILY_SCORING") {
      self.allow_local_scoring_in_daily = matches!(raw.trim(), "1" | "true" | "yes");
    }
  }

  pub fn api_base_url(&self) -> &str {
    self.api_base_url.trim_end_matches('/')
  }

  pub fn storage_path(&self) -> PathBuf {
    self.data_dir.join("local_storage.json")
  }

  /// Configured fallback table if it is well-formed, otherwise the built-in one.
  pub fn fallback_table(&self) -> FallbackTable {
    match &self.fallback {
      Some(f) => match FallbackTable::from_parts(f.themes.clone(), f.emotions.clone(), f.word_banks.clone()) {
        Ok(table) => table,
        Err(e) => {
          error!(target: "stanzle", error = %e, "Invalid fallback table in config; using built-in table");
          FallbackTable::builtin()
        }
      },
      None => FallbackTable::builtin(),
    }
  }

  pub fn feedback_templates(&self) -> Vec<String> {
    match &self.feedback_templates {
      Some(t) if t.iter().any(|s| !s.trim().is_empty()) => {
        t.iter().filter(|s| !s.trim().is_empty()).cloned().collect()
      }
      _ => builtin_feedback_templates(),
    }
  }
}

/// Parse a TOML document into a config.
pub fn parse_config(s: &str) -> Result<ClientConfig, toml::de::Error> {
  toml::from_str::<ClientConfig>(s)
}

/// Attempt to load `ClientConfig` from STANZLE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env_path() -> Option<ClientConfig> {
  let path = std::env::var("STANZLE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "stanzle", %path, "Loaded client config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "stanzle", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "stanzle", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
