//! Outbound IRC messages and helpers over the `irc-proto` message model.

pub use irc_proto::{Command, Message, Prefix, Response};

pub fn nick(nickname: &str) -> Message {
    Command::NICK(nickname.to_string()).into()
}

/// `USER <username> 0 * <realname>`
pub fn user(username: &str, realname: &str) -> Message {
    Command::USER(username.to_string(), "0".to_string(), realname.to_string()).into()
}

pub fn join(channel: &str) -> Message {
    Command::JOIN(channel.to_string(), None, None).into()
}

pub fn ping(token: &str) -> Message {
    Command::PING(token.to_string(), None).into()
}

pub fn pong(token: &str) -> Message {
    Command::PONG(token.to_string(), None).into()
}

pub fn privmsg(target: &str, text: &str) -> Message {
    Command::PRIVMSG(target.to_string(), text.to_string()).into()
}

/// Full source identity (`nick!user@host` or a server name), empty when the
/// message has no prefix.
pub fn source(message: &Message) -> String {
    message
        .prefix
        .as_ref()
        .map(Prefix::to_string)
        .unwrap_or_default()
}

/// Whether the message was sent by `nick`.
pub fn is_from(message: &Message, nick: &str) -> bool {
    message.source_nickname() == Some(nick)
}
