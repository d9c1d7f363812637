//! Small utility helpers used across modules.

use serde::{Deserialize, Deserializer};

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole poems or response bodies.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Token prefix suitable for logs. Never log a full session token.
pub fn mask_token(token: &str) -> String {
  let prefix: String = token.chars().take(6).collect();
  format!("{prefix}…")
}

/// Plain text → minimal HTML body (escaped, one `<br>` per line break),
/// the shape the editor would have produced for unformatted text.
pub fn text_to_html(text: &str) -> String {
  let escaped = text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;");
  escaped.lines().collect::<Vec<_>>().join("<br>")
}

/// Score fields coming back from the model-backed endpoints are not always
/// numbers: accept numbers and numeric strings, map anything else to `None`.
pub fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match raw {
    Some(serde_json::Value::Number(n)) => n.as_f64(),
    Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
    _ => None,
  })
}
