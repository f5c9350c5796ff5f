//! services/client/src/http/envelope.rs
//!
//! Shapes of the JSON bodies the backend answers with.

use serde::Deserialize;
use serde_json::Value;

/// Successful responses wrap their payload in a `data` field.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Pulls a human-readable message out of an error body.
///
/// Prefers `message`, then `error`; anything unparseable yields `None`.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}
