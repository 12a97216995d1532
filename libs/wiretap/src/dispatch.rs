use std::sync::Arc;

use serde_json::Value;

use wiretap_common::json::log_json;

use crate::link::{Link, LinkChain, LoggingLink};
use crate::options::LogOptions;
use crate::pubsub::{LoggingPubSub, PubSubEngine};

/// The collaborator shapes the decorators recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorKind {
  /// A request-forwarding link chain element.
  Link,
  /// A publish/subscribe engine.
  PubSub,
  /// A `query`-based network interface. Detected for error reporting only;
  /// the decorator for it was retired.
  NetworkInterface,
  /// A subscription manager exposing per-field setup functions. Detected for
  /// error reporting only; the decorator for it was retired.
  SubscriptionManager,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DispatchError {
  #[error("unknown collaborator passed to wiretap: {descriptor}")]
  UnrecognizedCollaborator { descriptor: String },
  #[error("collaborator kind {0:?} is deprecated and no longer decoratable")]
  DeprecatedCollaborator(CollaboratorKind),
}

impl CollaboratorKind {
  /// Classifies a JSON capability descriptor by the operations it
  /// advertises, for config-driven wiring. Selection in code should use the
  /// [`Collaborator`] variants directly instead.
  pub fn detect(descriptor: &Value) -> Result<CollaboratorKind, DispatchError> {
    let capabilities = descriptor.as_object();
    let advertises = |operation: &str| {
      capabilities
        .map(|object| object.contains_key(operation))
        .unwrap_or(false)
    };

    if advertises("request") {
      Ok(CollaboratorKind::Link)
    } else if advertises("publish") {
      Ok(CollaboratorKind::PubSub)
    } else if advertises("query") {
      Ok(CollaboratorKind::NetworkInterface)
    } else if advertises("setupFunctions") {
      Ok(CollaboratorKind::SubscriptionManager)
    } else {
      Err(DispatchError::UnrecognizedCollaborator {
        descriptor: log_json(descriptor),
      })
    }
  }

  /// Like [`CollaboratorKind::detect`], but rejects shapes that no longer
  /// have a decorator.
  pub fn detect_for_decoration(descriptor: &Value) -> Result<CollaboratorKind, DispatchError> {
    match CollaboratorKind::detect(descriptor)? {
      kind @ (CollaboratorKind::NetworkInterface | CollaboratorKind::SubscriptionManager) => {
        Err(DispatchError::DeprecatedCollaborator(kind))
      }
      kind => Ok(kind),
    }
  }
}

/// A collaborator selected by the caller for decoration.
pub enum Collaborator {
  Link(Arc<dyn Link>),
  PubSub(Arc<dyn PubSubEngine>),
}

/// Returns a same-shaped collaborator whose operations emit log lines while
/// delegating unchanged. The caller uses the result exactly as it would use
/// the undecorated value.
pub fn decorate(collaborator: Collaborator, options: LogOptions) -> Collaborator {
  match collaborator {
    Collaborator::Link(inner) => {
      let logging: Arc<dyn Link> = Arc::new(LoggingLink::new(options));
      Collaborator::Link(Arc::new(LinkChain::new(vec![logging, inner])))
    }
    Collaborator::PubSub(inner) => {
      Collaborator::PubSub(Arc::new(LoggingPubSub::new(inner, options)))
    }
  }
}
