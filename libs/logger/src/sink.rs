/// A destination for decorator log lines.
///
/// Sinks are infallible: a line handed to `write` is either emitted or
/// dropped, never surfaced back to the decorated call as an error.
pub trait LogSink: Send + Sync {
  fn write(&self, line: &str);
}

/// Writes each line to the standard output stream. This is the default sink.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
  fn write(&self, line: &str) {
    println!("{}", line);
  }
}

/// Routes lines through `tracing` at debug level, for embedders that already
/// run a `tracing-subscriber` stack.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
  fn write(&self, line: &str) {
    tracing::debug!(target: "wiretap", "{}", line);
  }
}

/// Collects lines in memory so tests can assert on exact log output.
#[cfg(feature = "test_utils")]
#[derive(Debug, Default)]
pub struct MemorySink {
  lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(feature = "test_utils")]
impl MemorySink {
  pub fn new() -> std::sync::Arc<Self> {
    std::sync::Arc::new(Self::default())
  }

  pub fn lines(&self) -> Vec<String> {
    self.lines.lock().unwrap().clone()
  }
}

#[cfg(feature = "test_utils")]
impl LogSink for MemorySink {
  fn write(&self, line: &str) {
    self.lines.lock().unwrap().push(line.to_string());
  }
}
