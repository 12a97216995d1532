use serde::Serialize;

/// JSON-encodes a value for inclusion in a log line.
///
/// Log emission must never fail, so a serialization error collapses into a
/// quoted placeholder instead of propagating.
pub fn log_json<T: Serialize + ?Sized>(value: &T) -> String {
  serde_json::to_string(value).unwrap_or_else(|e| format!("\"<unserializable: {}>\"", e))
}
