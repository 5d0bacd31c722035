//! UDP feed relayed into the channel.
//!
//! Every datagram (e.g. a MediaWiki recent-changes line) is posted to the
//! channel of whichever chat session is live. Packets arriving while no
//! session is live are dropped.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::relay::registry::SessionRegistry;

/// Largest UDP payload.
const MAX_DATAGRAM: usize = 65_535;

pub struct DatagramRelay {
    socket: UdpSocket,
    registry: SessionRegistry,
}

impl DatagramRelay {
    pub async fn bind(addr: SocketAddr, registry: SessionRegistry) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening for messages on {}", socket.local_addr()?);
        Ok(Self { socket, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive and relay packets until the task is dropped.
    pub async fn run(self) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    self.relay(&buf[..n], from);
                }
                Err(e) => warn!("UDP receive failed: {}", e),
            }
        }
    }

    /// Forward one packet. Returns whether it reached a live session.
    pub fn relay(&self, payload: &[u8], from: SocketAddr) -> bool {
        debug!("Received {} bytes from {}", payload.len(), from);

        let Some(gateway) = self.registry.current() else {
            info!("No live session, dropping message from {}", from);
            return false;
        };

        let text = String::from_utf8_lossy(payload);
        info!("Relaying message from {} to {}", from, gateway.channel());
        gateway.deliver_to_channel(&text) > 0
    }
}
