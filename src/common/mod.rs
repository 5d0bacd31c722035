//! Common utilities and types shared across the application.

pub mod backoff;
pub mod error;
pub mod messages;

pub use backoff::BackoffConnector;
pub use messages::{nick_of, MessageContext, OutgoingMessage, ReplyTarget};
