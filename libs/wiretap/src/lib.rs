pub mod dispatch;
pub mod link;
pub mod options;
pub mod pubsub;

pub use dispatch::{decorate, Collaborator, CollaboratorKind, DispatchError};
pub use link::{Link, LinkChain, LinkError, LoggingLink, NextLink, ResultStream};
pub use options::{LogOptions, OperationFormatter, WiretapConfig};
pub use pubsub::in_memory::InMemoryPubSub;
pub use pubsub::{
  LoggingPubSub, MessageHandler, MessageIterator, PubSubEngine, PubSubError, SubscriptionId,
};
