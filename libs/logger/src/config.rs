use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq)]
/// Output format for the internal logger.
pub enum LoggerConfigFormat {
  /// Minimal, compact output. Suitable for production environments where log
  /// size matters.
  #[serde(rename = "compact")]
  #[schemars(title = "compact")]
  Compact,

  /// Verbose, human-oriented output with well-formatted fields. Ideal for
  /// development and debugging.
  #[serde(rename = "pretty")]
  #[schemars(title = "pretty")]
  Pretty,

  /// Structured JSON output, for log aggregators and analysis systems.
  #[serde(rename = "json")]
  #[schemars(title = "json")]
  Json,
}

impl Default for LoggerConfigFormat {
  // In development, we wish to see some more details and code locations.
  #[cfg(debug_assertions)]
  fn default() -> Self {
    LoggerConfigFormat::Pretty
  }

  #[cfg(not(debug_assertions))]
  fn default() -> Self {
    if atty::is(atty::Stream::Stdout) {
      LoggerConfigFormat::Compact
    } else {
      LoggerConfigFormat::Json
    }
  }
}
