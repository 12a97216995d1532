use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;

use wiretap_common::graphql::{GraphQLResponse, ParsedGraphQLRequest};
use wiretap_common::json::log_json;
use wiretap_logger::sink::LogSink;

use crate::options::{LogOptions, ResolvedLogOptions};

/// Errors surfaced by the transport at the far end of a link chain.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum LinkError {
  #[error("transport error: {0}")]
  Transport(String),
  #[error("malformed upstream response: {0}")]
  MalformedResponse(String),
}

pub type LinkResult = Result<GraphQLResponse, LinkError>;

/// A lazy, possibly multi-value result stream produced by forwarding an
/// operation. End-of-stream and `Err` items are both terminal.
pub type ResultStream = Pin<Box<dyn Stream<Item = LinkResult> + Send>>;

/// Advances an operation through the remainder of the chain.
pub type NextLink = Box<dyn FnOnce(ParsedGraphQLRequest) -> ResultStream + Send>;

/// A composable middleware unit: forwards an operation to the next unit in
/// the chain and observes/transforms its result stream.
pub trait Link: Send + Sync {
  fn request(&self, operation: ParsedGraphQLRequest, forward: NextLink) -> ResultStream;
}

/// An ordered chain of links. The chain is itself a link, so chains compose.
pub struct LinkChain {
  links: Vec<Arc<dyn Link>>,
}

impl LinkChain {
  pub fn new(links: Vec<Arc<dyn Link>>) -> Self {
    LinkChain { links }
  }
}

impl Link for LinkChain {
  fn request(&self, operation: ParsedGraphQLRequest, forward: NextLink) -> ResultStream {
    drive(self.links.clone(), operation, forward)
  }
}

fn drive(
  mut links: Vec<Arc<dyn Link>>,
  operation: ParsedGraphQLRequest,
  terminal: NextLink,
) -> ResultStream {
  if links.is_empty() {
    return terminal(operation);
  }

  let head = links.remove(0);
  head.request(
    operation,
    Box::new(move |operation| drive(links, operation, terminal)),
  )
}

/// A link that logs the lifecycle of every operation passing through it:
/// operation start (subscriptions, and optionally all operations), every
/// resolved value and error, and unsubscription. Values, errors and
/// completion are delivered to the consumer unchanged.
pub struct LoggingLink {
  options: ResolvedLogOptions,
}

impl LoggingLink {
  pub fn new(options: LogOptions) -> Self {
    LoggingLink {
      options: options.resolve(),
    }
  }
}

impl Link for LoggingLink {
  fn request(&self, operation: ParsedGraphQLRequest, forward: NextLink) -> ResultStream {
    let label = (self.options.formatter)(&operation.request);
    let is_subscription = operation.is_running_subscription();
    let sink = self.options.sink.clone();

    if is_subscription {
      sink.write(&format!("subscribe <= {}", label));
    } else if self.options.log_request_start {
      sink.write(&format!("loading <= {}", label));
    }

    Box::pin(LoggedResultStream {
      inner: forward(operation),
      sink,
      label,
      is_subscription,
      terminated: false,
    })
  }
}

struct LoggedResultStream {
  inner: ResultStream,
  sink: Arc<dyn LogSink>,
  label: String,
  is_subscription: bool,
  terminated: bool,
}

impl Stream for LoggedResultStream {
  type Item = LinkResult;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();

    if this.terminated {
      return Poll::Ready(None);
    }

    match this.inner.as_mut().poll_next(cx) {
      Poll::Ready(Some(Ok(value))) => {
        this
          .sink
          .write(&format!("{} <= {}", log_json(&value), this.label));
        Poll::Ready(Some(Ok(value)))
      }
      Poll::Ready(Some(Err(error))) => {
        this.terminated = true;
        this
          .sink
          .write(&format!("{} <=e {}", log_json(&error), this.label));
        Poll::Ready(Some(Err(error)))
      }
      Poll::Ready(None) => {
        this.terminated = true;
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

impl Drop for LoggedResultStream {
  // Dropping the wrapper before a terminal event is the consumer
  // unsubscribing; the wrapped stream drops with it, which propagates the
  // cancellation.
  fn drop(&mut self) {
    if self.is_subscription && !self.terminated {
      self.sink.write(&format!("unsubscribe <= {}", self.label));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::{stream, StreamExt};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use wiretap_common::graphql::GraphQLRequest;
  use wiretap_logger::sink::MemorySink;

  fn operation(document: &str, name: Option<&str>) -> ParsedGraphQLRequest {
    ParsedGraphQLRequest::create_and_parse(GraphQLRequest {
      operation: document.to_string(),
      operation_name: name.map(ToString::to_string),
      variables: None,
      extensions: None,
    })
    .expect("operation should parse")
  }

  fn user_response(id: u64) -> GraphQLResponse {
    GraphQLResponse::new_data(json!({ "user": { "id": id } }))
  }

  #[tokio::test]
  async fn forwards_values_and_completion_unchanged() {
    let sink = MemorySink::new();
    let link = LoggingLink::new(LogOptions::with_sink(sink.clone()));

    // a response carrying GraphQL errors is still a value, not a stream error
    let results: Vec<_> = link
      .request(
        operation("query GetUser { user { id } }", Some("GetUser")),
        Box::new(|_operation| {
          Box::pin(stream::iter(vec![
            Ok(user_response(1)),
            Ok(GraphQLResponse::new_error("field unavailable")),
          ]))
        }),
      )
      .collect()
      .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], Ok(user_response(1)));
    assert_eq!(
      results[1],
      Ok(GraphQLResponse::new_error("field unavailable"))
    );

    assert_eq!(
      sink.lines(),
      vec![
        "{\"data\":{\"user\":{\"id\":1}}} <= GetUser",
        "{\"errors\":[{\"message\":\"field unavailable\"}]} <= GetUser",
      ]
    );
  }

  #[tokio::test]
  async fn pre_forward_line_is_opt_in_for_non_subscriptions() {
    let sink = MemorySink::new();
    let link = LoggingLink::new(LogOptions {
      sink: Some(sink.clone()),
      log_request_start: true,
      ..Default::default()
    });

    let results: Vec<_> = link
      .request(
        operation("query GetUser { user { id } }", Some("GetUser")),
        Box::new(|_operation| Box::pin(stream::iter(vec![Ok(user_response(1))]))),
      )
      .collect()
      .await;

    assert_eq!(results.len(), 1);
    assert_eq!(
      sink.lines(),
      vec![
        "loading <= GetUser",
        "{\"data\":{\"user\":{\"id\":1}}} <= GetUser",
      ]
    );
  }

  #[tokio::test]
  async fn errors_are_logged_then_forwarded_verbatim() {
    let sink = MemorySink::new();
    let link = LoggingLink::new(LogOptions::with_sink(sink.clone()));

    let mut results = link.request(
      operation("query GetUser { user { id } }", Some("GetUser")),
      Box::new(|_operation| {
        Box::pin(stream::iter(vec![Err(LinkError::Transport(
          "connection reset".to_string(),
        ))]))
      }),
    );

    assert_eq!(
      results.next().await,
      Some(Err(LinkError::Transport("connection reset".to_string())))
    );
    assert_eq!(results.next().await, None);

    assert_eq!(
      sink.lines(),
      vec!["{\"Transport\":\"connection reset\"} <=e GetUser"]
    );
  }

  #[tokio::test]
  async fn subscriptions_log_subscribe_and_unsubscribe_on_cancellation() {
    let sink = MemorySink::new();
    let link = LoggingLink::new(LogOptions::with_sink(sink.clone()));

    let cancellations = Arc::new(AtomicUsize::new(0));
    let probe = cancellations.clone();

    let mut results = link.request(
      operation(
        "subscription OnUserAdded { userAdded { id } }",
        Some("OnUserAdded"),
      ),
      Box::new(move |_operation| {
        let guard = DropGuard(probe);
        Box::pin(
          stream::iter(vec![Ok(user_response(1))])
            .chain(stream::pending())
            .map(move |item| {
              let _live = &guard;
              item
            }),
        )
      }),
    );

    assert_eq!(results.next().await, Some(Ok(user_response(1))));
    drop(results);

    assert_eq!(cancellations.load(Ordering::SeqCst), 1);
    assert_eq!(
      sink.lines(),
      vec![
        "subscribe <= OnUserAdded",
        "{\"data\":{\"user\":{\"id\":1}}} <= OnUserAdded",
        "unsubscribe <= OnUserAdded",
      ]
    );
  }

  #[tokio::test]
  async fn completed_subscriptions_do_not_log_unsubscribe() {
    let sink = MemorySink::new();
    let link = LoggingLink::new(LogOptions::with_sink(sink.clone()));

    let results: Vec<_> = link
      .request(
        operation(
          "subscription OnUserAdded { userAdded { id } }",
          Some("OnUserAdded"),
        ),
        Box::new(|_operation| Box::pin(stream::iter(vec![Ok(user_response(1))]))),
      )
      .collect()
      .await;

    assert_eq!(results.len(), 1);
    assert_eq!(
      sink.lines(),
      vec![
        "subscribe <= OnUserAdded",
        "{\"data\":{\"user\":{\"id\":1}}} <= OnUserAdded",
      ]
    );
  }

  #[tokio::test]
  async fn chain_threads_operations_through_each_link_in_order() {
    let sink = MemorySink::new();

    let outer: Arc<dyn Link> = Arc::new(LoggingLink::new(LogOptions {
      formatter: Some(Arc::new(|_request: &GraphQLRequest| "outer".to_string())),
      sink: Some(sink.clone()),
      log_request_start: true,
    }));
    let inner: Arc<dyn Link> = Arc::new(LoggingLink::new(LogOptions {
      formatter: Some(Arc::new(|_request: &GraphQLRequest| "inner".to_string())),
      sink: Some(sink.clone()),
      log_request_start: true,
    }));

    let chain = LinkChain::new(vec![outer, inner]);
    let parsed = ParsedGraphQLRequest::create_and_parse(GraphQLRequest::default())
      .expect("default operation should parse");

    let results: Vec<_> = chain
      .request(
        parsed,
        Box::new(|_operation| Box::pin(stream::iter(vec![Ok(user_response(1))]))),
      )
      .collect()
      .await;

    assert_eq!(results.len(), 1);
    // The outer element logs its start line first; values surface from the
    // innermost wrapper outwards.
    assert_eq!(
      sink.lines(),
      vec![
        "loading <= outer",
        "loading <= inner",
        "{\"data\":{\"user\":{\"id\":1}}} <= inner",
        "{\"data\":{\"user\":{\"id\":1}}} <= outer",
      ]
    );
  }

  struct DropGuard(Arc<AtomicUsize>);

  impl Drop for DropGuard {
    fn drop(&mut self) {
      self.0.fetch_add(1, Ordering::SeqCst);
    }
  }
}
