//! The relay: chat session, command handling and the UDP feed.

pub mod datagram;
pub mod formatter;
pub mod gateway;
pub mod handler;
pub mod links;
pub mod registry;
pub mod router;
pub mod session;

pub use datagram::DatagramRelay;
pub use gateway::ReplyGateway;
pub use handler::MessageHandler;
pub use registry::SessionRegistry;
pub use router::CommandRouter;
pub use session::ChatSession;
