//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL sets the filter ("debug", or directives such as
//!   "warn,challenge=debug,scoring=debug").
//! - LOG_FORMAT picks "pretty" (default), "compact" or "json".
//!
//! Modules log under the `stanzle`, `challenge`, `scoring`, `archive` and
//! `session` targets. Everything goes to stderr; stdout belongs to the CLI.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,stanzle=info,challenge=info,scoring=info,archive=info,session=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to pretty output.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

fn filter_from(value: Option<&str>) -> EnvFilter {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(level.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Each format is its own subscriber type, so install inside the match.
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}
