//! Stream multiplexer
//!
//! Opens one connection per call and runs a dedicated event loop for it.
//! The loop consumes transport events strictly in order, so handlers
//! never run concurrently for the same connection.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use ks_core::traits::{
    ActiveClusterConfig, ConnectRequest, Connector, Headers, TlsOptions, TransportEvent,
};
use ks_core::{ConnectionError, KsError};
use ks_protocol::Frame;

use crate::connection::Connection;
use crate::handler::{HandlerAction, StreamHandler};

/// Channel subprotocols offered during the upgrade, most preferred first
pub const SUBPROTOCOLS: [&str; 4] = [
    "v4.channel.k8s.io",
    "v3.channel.k8s.io",
    "v2.channel.k8s.io",
    "channel.k8s.io",
];

/// Opens multiplexed connections to the current cluster
#[derive(Clone)]
pub struct Multiplexer {
    config: Arc<dyn ActiveClusterConfig>,
    connector: Arc<dyn Connector>,
}

impl Multiplexer {
    /// Create a multiplexer for the given cluster and connector
    pub fn new(config: Arc<dyn ActiveClusterConfig>, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// Build the connect request for `path`
    ///
    /// Fails with a configuration error before any network activity when
    /// no cluster is selected.
    pub fn request(&self, path: &str) -> Result<ConnectRequest, KsError> {
        let server = self.config.current_cluster_server_url()?;
        let url = stream_url(&server, path)?;

        let mut headers = Headers::new();
        self.config.apply_auth_headers(&mut headers)?;

        let mut tls = TlsOptions::default();
        self.config.apply_tls_options(&mut tls)?;

        Ok(ConnectRequest {
            url,
            headers,
            tls,
            protocols: SUBPROTOCOLS.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Connect to `path` and dispatch inbound events to `handler`
    ///
    /// Resolves once the connection is open. Errors reported before that
    /// reject the call; errors after it go to [`StreamHandler::on_error`].
    pub async fn connect<H: StreamHandler>(
        &self,
        path: &str,
        handler: H,
    ) -> Result<Connection, KsError> {
        let request = self.request(path)?;
        tracing::debug!("Connecting to {}", request.url);

        let (transport, events) = self.connector.connect(request).await?;
        let connection = Connection::new(transport);

        let (open_tx, open_rx) = oneshot::channel();
        tokio::spawn(run_event_loop(connection.clone(), events, handler, open_tx));

        match open_rx.await {
            Ok(Ok(())) => Ok(connection),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ConnectionError::ClosedBeforeOpen.into()),
        }
    }
}

/// Map the cluster server URL to the stream endpoint for `path`
///
/// `https` becomes `wss` and `http` becomes `ws`; host, port and any
/// path prefix of the server URL are kept.
pub fn stream_url(server: &Url, path: &str) -> Result<Url, ConnectionError> {
    let scheme = match server.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ConnectionError::InvalidUrl(format!(
                "unsupported scheme {:?}",
                other
            )))
        }
    };

    let mut base = server.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.set_scheme(scheme)
        .map_err(|()| ConnectionError::InvalidUrl(format!("cannot use scheme {}", scheme)))?;

    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", joined, e)))
}

fn apply_action(connection: &Connection, action: HandlerAction) {
    if action == HandlerAction::Close {
        connection.close();
    }
}

fn dispatch_binary<H: StreamHandler>(connection: &Connection, handler: &mut H, message: Bytes) {
    match Frame::split(message) {
        Ok(frame) => {
            let action = handler.on_binary(frame.tag, &frame.payload);
            apply_action(connection, action);
        }
        Err(e) => tracing::warn!("Dropping frame: {}", e),
    }
}

type OpenSender = oneshot::Sender<Result<(), ConnectionError>>;

/// Per-connection event loop
///
/// The connection only counts as finished after the handler's close hook
/// has run, so waiters on [`Connection::closed`] see all of its output.
async fn run_event_loop<H: StreamHandler>(
    connection: Connection,
    events: mpsc::Receiver<TransportEvent>,
    mut handler: H,
    open_tx: OpenSender,
) {
    let delivered = dispatch_events(&connection, events, &mut handler, open_tx).await;

    connection.mark_closed();
    if delivered {
        tracing::debug!("Connection closed");
        handler.on_close();
    }
    connection.mark_finished();
}

/// Resolves when the caller stops waiting for the connect result
async fn connect_abandoned(pending: &mut Option<OpenSender>) {
    match pending {
        Some(tx) => tx.closed().await,
        None => std::future::pending().await,
    }
}

/// Consume events until the connection ends
///
/// Returns whether the open connection was handed to the caller.
async fn dispatch_events<H: StreamHandler>(
    connection: &Connection,
    mut events: mpsc::Receiver<TransportEvent>,
    handler: &mut H,
    open_tx: OpenSender,
) -> bool {
    let mut pending = Some(open_tx);

    loop {
        let event = tokio::select! {
            biased;
            event = events.recv() => event,
            _ = connection.closing() => None,
            _ = connect_abandoned(&mut pending) => {
                tracing::debug!("Connect abandoned before open, closing connection");
                connection.close();
                return false;
            }
        };
        let Some(event) = event else {
            break;
        };

        match event {
            TransportEvent::Open => match pending.take() {
                Some(tx) => {
                    connection.mark_open();
                    if tx.send(Ok(())).is_err() {
                        tracing::debug!("Connect abandoned at open, closing connection");
                        connection.close();
                        return false;
                    }
                    tracing::debug!("Connection open");
                }
                None => tracing::debug!("Ignoring duplicate open event"),
            },

            TransportEvent::Text(text) => {
                let action = handler.on_text(&text);
                apply_action(connection, action);
            }

            TransportEvent::Binary(message) => {
                dispatch_binary(connection, handler, message);
            }

            TransportEvent::Error(message) => {
                let error = ConnectionError::Transport(message);
                match pending.take() {
                    Some(tx) => {
                        tracing::debug!("Connection failed before open: {}", error);
                        connection.close();
                        let _ = tx.send(Err(error));
                        return false;
                    }
                    None => {
                        tracing::debug!("Connection error: {}", error);
                        let action = handler.on_error(&error);
                        apply_action(connection, action);
                    }
                }
            }

            TransportEvent::Close => break,
        }
    }

    match pending.take() {
        Some(tx) => {
            let _ = tx.send(Err(ConnectionError::ClosedBeforeOpen));
            false
        }
        None => true,
    }
}
