use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::{MessageHandler, MessageIterator, PubSubEngine, PubSubError, SubscriptionId};

/// A process-local pubsub engine backed by in-memory channels.
///
/// Handlers registered with `subscribe` run synchronously on the publishing
/// task; message iterators receive their copies over unbounded channels.
#[derive(Default)]
pub struct InMemoryPubSub {
  state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
  last_subscription_id: SubscriptionId,
  handlers: HashMap<SubscriptionId, (String, MessageHandler)>,
  iterators: HashMap<String, Vec<UnboundedSender<Value>>>,
}

#[async_trait]
impl PubSubEngine for InMemoryPubSub {
  async fn publish(&self, trigger: &str, payload: Value) -> Result<(), PubSubError> {
    let (handlers, senders) = {
      let mut state = self.state.lock().unwrap();

      let handlers: Vec<MessageHandler> = state
        .handlers
        .values()
        .filter(|(subscribed_trigger, _)| subscribed_trigger == trigger)
        .map(|(_, handler)| handler.clone())
        .collect();

      let senders: Vec<UnboundedSender<Value>> = match state.iterators.get_mut(trigger) {
        Some(senders) => {
          senders.retain(|sender| !sender.is_closed());
          senders.clone()
        }
        None => Vec::new(),
      };

      (handlers, senders)
    };

    debug!(
      trigger,
      handlers = handlers.len(),
      iterators = senders.len(),
      "delivering published message"
    );

    for handler in &handlers {
      handler(payload.clone());
    }

    for sender in &senders {
      // a receiver closed between the snapshot and the send is not an error
      let _ = sender.send(payload.clone());
    }

    Ok(())
  }

  async fn subscribe(
    &self,
    trigger: &str,
    handler: MessageHandler,
  ) -> Result<SubscriptionId, PubSubError> {
    let mut state = self.state.lock().unwrap();

    state.last_subscription_id += 1;
    let subscription_id = state.last_subscription_id;
    state
      .handlers
      .insert(subscription_id, (trigger.to_string(), handler));

    Ok(subscription_id)
  }

  async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), PubSubError> {
    let mut state = self.state.lock().unwrap();

    match state.handlers.remove(&subscription_id) {
      Some(_) => Ok(()),
      None => Err(PubSubError::UnknownSubscription(subscription_id)),
    }
  }

  fn message_iterator(&self, triggers: Vec<String>) -> Box<dyn MessageIterator> {
    let (sender, receiver) = unbounded_channel();
    let mut state = self.state.lock().unwrap();

    for trigger in triggers {
      state.iterators.entry(trigger).or_default().push(sender.clone());
    }

    Box::new(InMemoryIterator { receiver })
  }
}

struct InMemoryIterator {
  receiver: UnboundedReceiver<Value>,
}

#[async_trait]
impl MessageIterator for InMemoryIterator {
  async fn next(&mut self) -> Result<Option<Value>, PubSubError> {
    Ok(self.receiver.recv().await)
  }

  async fn throw(&mut self, error: PubSubError) -> Result<Option<Value>, PubSubError> {
    // closing stops further deliveries; already-queued messages are dropped
    // so the sequence terminates immediately
    self.receiver.close();
    while self.receiver.try_recv().is_ok() {}
    Err(error)
  }
}
