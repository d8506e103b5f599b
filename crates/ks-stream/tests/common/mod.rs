//! Shared test fixtures: a scripted connector and capturing sinks

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use ks_core::config::{Cluster, KubeConfig, NamedCluster, NamedUser, User};
use ks_core::traits::{ConnectRequest, Connector, Transport, TransportEvent};
use ks_core::ConnectionError;
use ks_stream::Multiplexer;

/// What the mock connector observed
#[derive(Default)]
pub struct MockState {
    pub requests: Mutex<Vec<ConnectRequest>>,
    pub sent: Mutex<Vec<Bytes>>,
    pub closes: AtomicUsize,
    /// Make every transport send fail
    pub fail_sends: AtomicBool,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockState {
    pub fn connects(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ConnectRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Deliver one event to the open connection
    pub async fn push(&self, event: TransportEvent) {
        let tx = self.events.lock().unwrap().clone().unwrap();
        tx.send(event).await.unwrap();
    }

    /// Deliver one event if the connection is still consuming events
    pub async fn try_push(&self, event: TransportEvent) -> bool {
        let tx = self.events.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn push_binary(&self, tag: u8, payload: &[u8]) {
        let mut message = vec![tag];
        message.extend_from_slice(payload);
        self.push(TransportEvent::Binary(Bytes::from(message))).await;
    }
}

struct MockTransport {
    state: Arc<MockState>,
}

impl Transport for MockTransport {
    fn send(&self, message: Bytes) -> Result<(), ConnectionError> {
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(ConnectionError::Transport("send failed".to_string()));
        }
        self.state.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector that replays a fixed script of events on connect
pub struct MockConnector {
    state: Arc<MockState>,
    script: Vec<TransportEvent>,
}

impl MockConnector {
    pub fn new(script: Vec<TransportEvent>) -> (Arc<Self>, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        let connector = Arc::new(Self {
            state: state.clone(),
            script,
        });
        (connector, state)
    }

    /// Connector whose connection opens immediately
    pub fn opening() -> (Arc<Self>, Arc<MockState>) {
        Self::new(vec![TransportEvent::Open])
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), ConnectionError> {
        self.state.requests.lock().unwrap().push(request);

        let (tx, rx) = mpsc::channel(64);
        for event in &self.script {
            tx.send(event.clone())
                .await
                .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        }
        *self.state.events.lock().unwrap() = Some(tx);

        let transport: Arc<dyn Transport> = Arc::new(MockTransport {
            state: self.state.clone(),
        });
        Ok((transport, rx))
    }
}

/// Kubeconfig pointing at a single TLS cluster with a bearer token
pub fn cluster_config() -> KubeConfig {
    let mut config = KubeConfig::new();
    config.load_from_cluster_and_user(
        NamedCluster {
            name: "foo".to_string(),
            cluster: Cluster {
                server: "https://foo.company.com".to_string(),
                ..Default::default()
            },
        },
        NamedUser {
            name: "bar".to_string(),
            user: User {
                token: Some("sometoken".to_string()),
                ..Default::default()
            },
        },
    );
    config
}

pub fn multiplexer(connector: Arc<MockConnector>) -> Multiplexer {
    Multiplexer::new(Arc::new(cluster_config()), connector)
}

/// Poll `cond` until it holds or a second has passed
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Cloneable in-memory sink
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that fails every write
pub struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
