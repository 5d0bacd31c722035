//! Canonical message types shared by the relay components.

/// Extract the nick from an IRC identity (`nick!user@host`).
///
/// Everything after the first `!` is the hostmask and is discarded. An
/// identity without `!` is returned unchanged.
pub fn nick_of(identity: &str) -> &str {
    match identity.split_once('!') {
        Some((nick, _)) => nick,
        None => identity,
    }
}

/// An inbound chat message with the context needed to answer it.
///
/// Built once per PRIVMSG and moved into any deferred completion, so a late
/// reply is always addressed with the context it was requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    /// Full sender identity (`nick!user@host`).
    pub sender: String,
    /// Sender nick, extracted from the identity.
    pub nick: String,
    /// Addressed target: a channel name or the bot's own nick.
    pub target: String,
    /// Raw message text.
    pub text: String,
}

impl MessageContext {
    pub fn new(sender: impl Into<String>, target: impl Into<String>, text: impl Into<String>) -> Self {
        let sender = sender.into();
        let nick = nick_of(&sender).to_string();
        Self {
            sender,
            nick,
            target: target.into(),
            text: text.into(),
        }
    }
}

/// Where a reply to a [`MessageContext`] goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Private reply to the given nick.
    Direct(String),
    /// The shared channel.
    Channel,
}

impl ReplyTarget {
    /// Messages addressed to the bot itself are answered privately,
    /// everything else is answered in the channel.
    pub fn resolve(ctx: &MessageContext, bot_nick: &str) -> Self {
        if ctx.target == bot_nick {
            ReplyTarget::Direct(ctx.nick.clone())
        } else {
            ReplyTarget::Channel
        }
    }
}

/// A single line queued for the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub target: String,
    pub text: String,
}
