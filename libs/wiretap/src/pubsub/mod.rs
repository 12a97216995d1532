pub mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use wiretap_common::json::log_json;
use wiretap_logger::sink::LogSink;

use crate::options::{LogOptions, ResolvedLogOptions};

/// Identifier handed out by [`PubSubEngine::subscribe`].
pub type SubscriptionId = u64;

/// Callback invoked with every message published to a subscribed trigger.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum PubSubError {
  #[error("unknown trigger \"{0}\"")]
  UnknownTrigger(String),
  #[error("unknown subscription id {0}")]
  UnknownSubscription(SubscriptionId),
  #[error("engine error: {0}")]
  Engine(String),
}

/// A publish/subscribe message bus abstraction: publish, subscribe by
/// trigger, unsubscribe, and pull-based iteration over trigger streams.
#[async_trait]
pub trait PubSubEngine: Send + Sync {
  async fn publish(&self, trigger: &str, payload: Value) -> Result<(), PubSubError>;

  async fn subscribe(
    &self,
    trigger: &str,
    handler: MessageHandler,
  ) -> Result<SubscriptionId, PubSubError>;

  async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), PubSubError>;

  fn message_iterator(&self, triggers: Vec<String>) -> Box<dyn MessageIterator>;
}

#[async_trait]
impl<T: PubSubEngine + ?Sized> PubSubEngine for Arc<T> {
  async fn publish(&self, trigger: &str, payload: Value) -> Result<(), PubSubError> {
    self.as_ref().publish(trigger, payload).await
  }

  async fn subscribe(
    &self,
    trigger: &str,
    handler: MessageHandler,
  ) -> Result<SubscriptionId, PubSubError> {
    self.as_ref().subscribe(trigger, handler).await
  }

  async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), PubSubError> {
    self.as_ref().unsubscribe(subscription_id).await
  }

  fn message_iterator(&self, triggers: Vec<String>) -> Box<dyn MessageIterator> {
    self.as_ref().message_iterator(triggers)
  }
}

/// A pull-based lazy sequence of messages for one or more triggers.
/// `Ok(None)` marks completion.
#[async_trait]
pub trait MessageIterator: Send {
  async fn next(&mut self) -> Result<Option<Value>, PubSubError>;

  /// Terminates the sequence with an error.
  async fn throw(&mut self, error: PubSubError) -> Result<Option<Value>, PubSubError>;
}

/// Wraps a pubsub engine so every operation logs its arguments and outcome
/// while delegating unchanged. Usable as a drop-in replacement for the
/// wrapped engine.
pub struct LoggingPubSub<P> {
  inner: P,
  options: ResolvedLogOptions,
}

impl<P: PubSubEngine> LoggingPubSub<P> {
  pub fn new(inner: P, options: LogOptions) -> Self {
    LoggingPubSub {
      inner,
      options: options.resolve(),
    }
  }
}

#[async_trait]
impl<P: PubSubEngine> PubSubEngine for LoggingPubSub<P> {
  async fn publish(&self, trigger: &str, payload: Value) -> Result<(), PubSubError> {
    self
      .options
      .sink
      .write(&format!("pubsub publish {} {}", trigger, log_json(&payload)));

    self.inner.publish(trigger, payload).await
  }

  async fn subscribe(
    &self,
    trigger: &str,
    handler: MessageHandler,
  ) -> Result<SubscriptionId, PubSubError> {
    let sink = self.options.sink.clone();
    let message_label = trigger.to_string();
    let logging_handler: MessageHandler = Arc::new(move |message: Value| {
      sink.write(&format!(
        "pubsub msg {}({})",
        message_label,
        log_json(&message)
      ));
      handler(message);
    });

    let result = self.inner.subscribe(trigger, logging_handler).await;

    // Finally-position log: emitted whether the delegate resolved or
    // rejected, with the outcome reported to the caller unchanged.
    match &result {
      Ok(subscription_id) => self.options.sink.write(&format!(
        "pubsub subscribe {} => {}",
        trigger, subscription_id
      )),
      Err(error) => self.options.sink.write(&format!(
        "pubsub subscribe {} => {}",
        trigger,
        log_json(error)
      )),
    }

    result
  }

  async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), PubSubError> {
    self
      .options
      .sink
      .write(&format!("pubsub unsubscribe {}", subscription_id));

    self.inner.unsubscribe(subscription_id).await
  }

  fn message_iterator(&self, triggers: Vec<String>) -> Box<dyn MessageIterator> {
    let label = triggers.join(",");

    Box::new(LoggingMessageIterator {
      inner: self.inner.message_iterator(triggers),
      sink: self.options.sink.clone(),
      label,
    })
  }
}

struct LoggingMessageIterator {
  inner: Box<dyn MessageIterator>,
  sink: Arc<dyn LogSink>,
  label: String,
}

#[async_trait]
impl MessageIterator for LoggingMessageIterator {
  async fn next(&mut self) -> Result<Option<Value>, PubSubError> {
    let result = self.inner.next().await;

    match &result {
      Ok(Some(message)) => self
        .sink
        .write(&format!("{}->next => {}", self.label, log_json(message))),
      Ok(None) => self.sink.write(&format!("{}->next => done", self.label)),
      Err(error) => self
        .sink
        .write(&format!("{}->next =>e {}", self.label, log_json(error))),
    }

    result
  }

  async fn throw(&mut self, error: PubSubError) -> Result<Option<Value>, PubSubError> {
    let thrown = log_json(&error);
    let result = self.inner.throw(error).await;

    match &result {
      Ok(Some(message)) => self.sink.write(&format!(
        "{}->throw({}) => {}",
        self.label,
        thrown,
        log_json(message)
      )),
      Ok(None) => self
        .sink
        .write(&format!("{}->throw({}) => done", self.label, thrown)),
      Err(returned) => self.sink.write(&format!(
        "{}->throw({}) =>e {}",
        self.label,
        thrown,
        log_json(returned)
      )),
    }

    result
  }
}
