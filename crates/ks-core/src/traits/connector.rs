//! Transport connector traits
//!
//! The upgrade handshake lives behind [`Connector`]. Once connected, a
//! transport reports its lifecycle as an ordered stream of
//! [`TransportEvent`]s and accepts whole outbound messages through
//! [`Transport::send`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use url::Url;

use crate::error::ConnectionError;

/// Request headers, ordered by name
pub type Headers = BTreeMap<String, String>;

/// TLS material applied to the connection
#[derive(Clone, Default)]
pub struct TlsOptions {
    /// PEM-encoded CA bundle used to verify the server
    pub ca: Option<Vec<u8>>,
    /// PEM-encoded client certificate
    pub cert: Option<Vec<u8>>,
    /// PEM-encoded client private key
    pub key: Option<Vec<u8>>,
    /// Accept any server certificate
    pub skip_tls_verify: bool,
}

impl fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsOptions")
            .field("ca", &self.ca.as_ref().map(Vec::len))
            .field("cert", &self.cert.as_ref().map(Vec::len))
            .field("key", &self.key.is_some())
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

/// Everything a connector needs to open one connection
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Full `ws`/`wss` endpoint including the query string
    pub url: Url,
    /// Headers to send with the upgrade request
    pub headers: Headers,
    /// TLS material
    pub tls: TlsOptions,
    /// Subprotocols offered, most preferred first
    pub protocols: Vec<String>,
}

/// Lifecycle and message events for one connection, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed
    Open,
    /// Text message
    Text(String),
    /// Binary message
    Binary(Bytes),
    /// Transport-level error
    Error(String),
    /// The connection is closed
    Close,
}

/// Outbound half of an established connection
pub trait Transport: Send + Sync {
    /// Queue one whole message
    ///
    /// Must not block: buffering and back-pressure belong to the transport.
    fn send(&self, message: Bytes) -> Result<(), ConnectionError>;

    /// Close the connection
    fn close(&self);
}

/// Opens connections to the cluster endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    /// Start connecting
    ///
    /// Returns as soon as the transport exists; handshake completion is
    /// reported as [`TransportEvent::Open`] on the returned receiver.
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), ConnectionError>;
}
