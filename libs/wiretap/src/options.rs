use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use wiretap_common::graphql::GraphQLRequest;
use wiretap_logger::sink::{LogSink, StdoutSink};

/// Maps an operation to the human-readable label used in its log lines.
pub type OperationFormatter = Arc<dyn Fn(&GraphQLRequest) -> String + Send + Sync>;

/// Options accepted by every decorator constructor. Unset fields fall back
/// to the defaults when the decorator is built: the default formatter is
/// [`GraphQLRequest::log_label`], the default sink writes to stdout.
#[derive(Clone, Default)]
pub struct LogOptions {
  pub formatter: Option<OperationFormatter>,
  pub sink: Option<Arc<dyn LogSink>>,
  /// Log a `loading <= <operation>` line when a non-subscription operation
  /// starts. Off by default; subscriptions always log `subscribe <=`.
  pub log_request_start: bool,
}

impl LogOptions {
  pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
    LogOptions {
      sink: Some(sink),
      ..Default::default()
    }
  }

  pub(crate) fn resolve(self) -> ResolvedLogOptions {
    ResolvedLogOptions {
      formatter: self
        .formatter
        .unwrap_or_else(|| Arc::new(|request: &GraphQLRequest| request.log_label())),
      sink: self.sink.unwrap_or_else(|| Arc::new(StdoutSink)),
      log_request_start: self.log_request_start,
    }
  }
}

#[derive(Clone)]
pub(crate) struct ResolvedLogOptions {
  pub formatter: OperationFormatter,
  pub sink: Arc<dyn LogSink>,
  pub log_request_start: bool,
}

/// The serializable part of the decorator configuration, for embedders that
/// wire the decorators from a config file. Runtime-only options (formatter,
/// sink) are set in code.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct WiretapConfig {
  /// When enabled, every non-subscription operation logs a line before it is
  /// forwarded down the chain, not only once results arrive.
  #[serde(default)]
  pub log_request_start: bool,
}

impl From<WiretapConfig> for LogOptions {
  fn from(config: WiretapConfig) -> Self {
    LogOptions {
      formatter: None,
      sink: None,
      log_request_start: config.log_request_start,
    }
  }
}
