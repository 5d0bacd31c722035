//! IRC client protocol: line codec, message helpers and server connector.

pub mod codec;
pub mod connector;
pub mod message;

pub use codec::{new_irc_connection, IrcConnection, MAX_LINE_LEN};
pub use connector::Connector;
