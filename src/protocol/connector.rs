//! IRC server TCP/TLS connection.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::config::types::ServerConfig;

/// Byte stream carrying an IRC connection, plain or TLS.
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// Boxed stream so plain and TLS connections share one session type.
pub type BoxedStream = Box<dyn IrcStream>;

/// Opens connections to the configured IRC server.
#[derive(Clone)]
pub struct Connector {
    host: String,
    port: u16,
    tls: Option<TlsConnector>,
}

impl Connector {
    /// Plain-text connector.
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            tls: None,
        }
    }

    /// Build a connector, preparing the TLS configuration when enabled.
    pub fn from_config(server: &ServerConfig) -> ConnectionResult<Self> {
        let mut connector = Self::new(server);
        if server.tls {
            let config = client_config().map_err(|e| ConnectionError::Tls {
                host: server.host.clone(),
                message: e.to_string(),
            })?;
            connector.tls = Some(TlsConnector::from(Arc::new(config)));
        }
        Ok(connector)
    }

    pub async fn connect(&self) -> ConnectionResult<BoxedStream> {
        info!("Connecting to {}:{} (tls: {})", self.host, self.port, self.tls.is_some());

        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| ConnectionError::ConnectFailed {
                host: self.host.clone(),
                port: self.port,
                source: e,
            })?;
        tcp.set_nodelay(true)?;

        let Some(tls) = &self.tls else {
            return Ok(Box::new(tcp));
        };

        let server_name = ServerName::try_from(self.host.clone()).map_err(|e| ConnectionError::Tls {
            host: self.host.clone(),
            message: e.to_string(),
        })?;

        let stream = tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| ConnectionError::Tls {
                host: self.host.clone(),
                message: e.to_string(),
            })?;

        debug!("TLS handshake with {} complete", self.host);
        Ok(Box::new(stream))
    }
}

fn client_config() -> Result<ClientConfig, rustls::Error> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!("Failed to load a native certificate: {}", e);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("Loaded {} native root certificates ({} ignored)", added, ignored);

    Ok(ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth())
}
