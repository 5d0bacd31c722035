//! Reply delivery for one chat session.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::common::{MessageContext, OutgoingMessage, ReplyTarget};
use crate::relay::formatter::reply_lines;

/// Sends replies into a live session's outgoing queue.
///
/// Cheap to clone; deferred completions carry their own copy. Once the
/// session behind it ends, deliveries are dropped.
#[derive(Debug, Clone)]
pub struct ReplyGateway {
    nickname: String,
    channel: String,
    tx: mpsc::UnboundedSender<OutgoingMessage>,
}

impl ReplyGateway {
    pub fn new(
        nickname: impl Into<String>,
        channel: impl Into<String>,
        tx: mpsc::UnboundedSender<OutgoingMessage>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            channel: channel.into(),
            tx,
        }
    }

    /// The bot's nick on this session.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the session is still consuming replies.
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Reply to an inbound message, privately or in the channel.
    ///
    /// Returns the number of lines queued.
    pub fn deliver(&self, ctx: &MessageContext, text: &str) -> usize {
        match ReplyTarget::resolve(ctx, &self.nickname) {
            ReplyTarget::Direct(nick) => self.send_to(&nick, text),
            ReplyTarget::Channel => self.send_to(&self.channel, text),
        }
    }

    /// Send to the shared channel unconditionally.
    pub fn deliver_to_channel(&self, text: &str) -> usize {
        self.send_to(&self.channel, text)
    }

    fn send_to(&self, target: &str, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for line in reply_lines(text, target) {
            let message = OutgoingMessage {
                target: target.to_string(),
                text: line,
            };
            if self.tx.send(message).is_err() {
                warn!("Session to {} is gone, dropping reply", target);
                return sent;
            }
            sent += 1;
        }

        if sent > 0 {
            info!("Message sent to {}", target);
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_gateway() -> (ReplyGateway, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ReplyGateway::new("snurr", "#snurr", tx), rx)
    }

    #[test]
    fn test_empty_text_sends_nothing() {
        let (gateway, mut rx) = make_gateway();
        let ctx = MessageContext::new("alice!host", "#snurr", "hi");

        assert_eq!(gateway.deliver(&ctx, ""), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_private_message_answered_privately() {
        let (gateway, mut rx) = make_gateway();
        let ctx = MessageContext::new("alice!host", "snurr", "!help");

        assert_eq!(gateway.deliver(&ctx, "hello"), 1);
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.target, "alice");
        assert_eq!(sent.text, "hello");
    }

    #[test]
    fn test_channel_message_answered_in_channel() {
        let (gateway, mut rx) = make_gateway();
        let ctx = MessageContext::new("alice!host", "#snurr", "!help");

        gateway.deliver(&ctx, "hello");
        assert_eq!(rx.try_recv().unwrap().target, "#snurr");
    }

    #[test]
    fn test_long_text_wrapped() {
        let (gateway, mut rx) = make_gateway();
        let text = "x".repeat(1200);

        assert_eq!(gateway.deliver_to_channel(&text), 3);
        let mut total = 0;
        while let Ok(sent) = rx.try_recv() {
            assert!(sent.text.len() <= 512);
            total += sent.text.len();
        }
        assert_eq!(total, 1200);
    }

    #[test]
    fn test_closed_session_drops_reply() {
        let (gateway, rx) = make_gateway();
        drop(rx);

        assert!(!gateway.is_live());
        assert_eq!(gateway.deliver_to_channel("late reply"), 0);
    }
}
