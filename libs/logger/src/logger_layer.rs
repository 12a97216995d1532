use crate::config::LoggerConfigFormat;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::{
  fmt::{self, time::UtcTime},
  Layer,
};

pub fn build_logger(
  format: &LoggerConfigFormat,
  filter: &str,
  print_performance_info: bool,
) -> Result<Box<dyn Layer<Registry> + Send + Sync>, tracing_subscriber::filter::ParseError> {
  let timer = UtcTime::rfc_3339();
  let filter = EnvFilter::try_new(filter)?;
  let performance_spans = match print_performance_info {
    true => tracing_subscriber::fmt::format::FmtSpan::CLOSE,
    false => tracing_subscriber::fmt::format::FmtSpan::NONE,
  };

  Ok(match format {
    LoggerConfigFormat::Json => fmt::Layer::<Registry>::default()
      .json()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_filter(filter)
      .boxed(),
    LoggerConfigFormat::Pretty => fmt::Layer::<Registry>::default()
      .pretty()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_filter(filter)
      .boxed(),
    LoggerConfigFormat::Compact => fmt::Layer::<Registry>::default()
      .compact()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_filter(filter)
      .boxed(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_a_layer_for_every_format() {
    for format in [
      LoggerConfigFormat::Compact,
      LoggerConfigFormat::Pretty,
      LoggerConfigFormat::Json,
    ] {
      assert!(build_logger(&format, "info", false).is_ok());
      assert!(build_logger(&format, "wiretap=debug", true).is_ok());
    }
  }

  #[test]
  fn rejects_invalid_filters() {
    assert!(build_logger(&LoggerConfigFormat::Json, "wiretap=notalevel", false).is_err());
  }
}
