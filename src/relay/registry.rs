//! The currently live chat session, shared with the datagram relay.

use std::sync::Arc;

use tokio::sync::watch;

use crate::relay::gateway::ReplyGateway;

/// Holds the gateway of the session that is currently connected, if any.
///
/// Published by the chat session once it has signed on and cleared when the
/// connection is lost. There is at most one live session.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    slot: Arc<watch::Sender<Option<ReplyGateway>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    pub fn publish(&self, gateway: ReplyGateway) {
        self.slot.send_replace(Some(gateway));
    }

    pub fn clear(&self) {
        self.slot.send_replace(None);
    }

    /// Gateway of the live session, or `None` between connections.
    pub fn current(&self) -> Option<ReplyGateway> {
        self.slot.borrow().as_ref().filter(|g| g.is_live()).cloned()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
