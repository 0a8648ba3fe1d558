//! Inline encoding of code snippets.
//!
//! A code asset's location holds either the literal snippet or a `data:` URL with a
//! `text/plain` MIME hint and a base64 payload. Decoding never fails the caller: a
//! missing or unreadable payload comes back as an empty string.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::warn;

const DATA_SCHEME: &str = "data:";
const PLAIN_TEXT_PREFIX: &str = "data:text/plain;base64,";

/// Encodes `text` as a `text/plain` base64 data URL.
#[must_use]
pub fn encode(text: &str) -> String {
    format!("{PLAIN_TEXT_PREFIX}{}", STANDARD.encode(text.as_bytes()))
}

/// Whether `stored` is in the inline-encoded form rather than literal text.
#[must_use]
pub fn is_encoded(stored: &str) -> bool {
    stored.starts_with(DATA_SCHEME)
}

/// Returns the readable text for a stored snippet.
///
/// Literal text is returned unchanged. Data URLs are decoded; a malformed URL,
/// invalid base64 or non-UTF-8 bytes yield an empty string.
#[must_use]
pub fn decode(stored: Option<&str>) -> String {
    let Some(stored) = stored else {
        return String::new();
    };
    let Some(rest) = stored.strip_prefix(DATA_SCHEME) else {
        return stored.to_string();
    };
    let Some((meta, payload)) = rest.split_once(',') else {
        warn!("Inline snippet has no payload separator");
        return String::new();
    };

    if !meta.split(';').any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return payload.to_string();
    }

    match STANDARD
        .decode(payload.trim())
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
    {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to decode inline snippet: {}", e);
            String::new()
        }
    }
}
