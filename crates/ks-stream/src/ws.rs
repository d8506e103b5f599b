//! WebSocket connector
//!
//! Implements [`Connector`] on top of tokio-tungstenite. Each connection
//! gets one task that performs the handshake and then shuttles messages
//! in both directions. Outbound messages are queued on an unbounded
//! channel so [`Transport::send`] never blocks the caller.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use ks_core::traits::{ConnectRequest, Connector, Transport, TransportEvent};
use ks_core::ConnectionError;

use crate::tls::tls_connector;

/// Default capacity of the inbound event queue
///
/// Inbound frames wait here until the connection's event loop writes
/// them to the local sinks.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

const PROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

enum Outbound {
    Message(Bytes),
    Close,
}

/// Outbound half handed to the multiplexer
struct WsTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WsTransport {
    fn send(&self, message: Bytes) -> Result<(), ConnectionError> {
        self.outbound
            .send(Outbound::Message(message))
            .map_err(|_| ConnectionError::Closed)
    }

    fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Connector for `ws://` and `wss://` endpoints
#[derive(Debug, Clone)]
pub struct WsConnector {
    event_capacity: usize,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Connector with a custom inbound event queue capacity
    pub fn with_capacity(event_capacity: usize) -> Self {
        Self {
            event_capacity: event_capacity.max(1),
        }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), ConnectionError> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ConnectionError::InvalidUrl(e.to_string()))?;

        let headers = ws_request.headers_mut();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConnectionError::Handshake(format!("invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConnectionError::Handshake(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }
        if !request.protocols.is_empty() {
            let value = HeaderValue::from_str(&request.protocols.join(", "))
                .map_err(|e| ConnectionError::Handshake(format!("invalid subprotocol: {}", e)))?;
            headers.insert(PROTOCOL_HEADER, value);
        }

        let tls = if request.url.scheme() == "wss" {
            Some(tokio_tungstenite::Connector::NativeTls(tls_connector(
                &request.tls,
            )?))
        } else {
            None
        };

        let (event_tx, event_rx) = mpsc::channel(self.event_capacity);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let result =
                tokio_tungstenite::connect_async_tls_with_config(ws_request, None, false, tls).await;
            match result {
                Ok((stream, response)) => {
                    tracing::debug!(
                        "WebSocket upgraded, protocol {:?}",
                        response.headers().get(PROTOCOL_HEADER)
                    );
                    if event_tx.send(TransportEvent::Open).await.is_err() {
                        return;
                    }
                    run_socket(stream, outbound_rx, &event_tx).await;
                }
                Err(e) => {
                    tracing::error!("WebSocket handshake failed: {}", e);
                    let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                }
            }
            let _ = event_tx.send(TransportEvent::Close).await;
        });

        let transport: Arc<dyn Transport> = Arc::new(WsTransport {
            outbound: outbound_tx,
        });
        Ok((transport, event_rx))
    }
}

/// Shuttle messages until either side closes
async fn run_socket<S>(
    stream: S,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::Sender<TransportEvent>,
) where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Message(message)) => {
                    if let Err(e) = sink.send(WsMessage::Binary(message)).await {
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = sink.close().await {
                        tracing::debug!("Error while closing WebSocket: {}", e);
                    }
                    return;
                }
            },

            inbound = source.next() => match inbound {
                Some(Ok(WsMessage::Binary(data))) => {
                    if events.send(TransportEvent::Binary(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Text(text))) => {
                    let text = text.as_str().to_owned();
                    if events.send(TransportEvent::Text(text)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!("Server closed WebSocket: {:?}", frame);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string())).await;
                    return;
                }
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_task_exit_fails() {
        let (outbound, rx) = mpsc::unbounded_channel();
        drop(rx);
        let transport = WsTransport { outbound };
        assert_eq!(
            transport.send(Bytes::from_static(b"\x00hi")),
            Err(ConnectionError::Closed)
        );
        transport.close();
    }
}
