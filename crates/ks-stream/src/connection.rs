//! Handle to one multiplexed connection

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use ks_core::traits::Transport;
use ks_core::{ConnectionError, ConnectionState};
use ks_protocol::{encode_frame, ChannelTag, TerminalSize};

/// Shared handle to one established connection
///
/// Clones refer to the same connection. Closing is idempotent: the
/// transport is asked to close at most once, however many clones call
/// [`Connection::close`].
///
/// A handle exists from the moment the transport is connecting, so its
/// state is never [`ConnectionState::Idle`].
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    state: watch::Sender<ConnectionState>,
    /// Cancelled when the state becomes `Closed`
    closing: CancellationToken,
    /// Cancelled once the event loop has run the handler's close hook
    finished: CancellationToken,
}

impl Connection {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            inner: Arc::new(Inner {
                transport,
                state,
                closing: CancellationToken::new(),
                finished: CancellationToken::new(),
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Whether the connection has closed
    pub fn is_closed(&self) -> bool {
        self.inner.closing.is_cancelled()
    }

    /// Wait until the connection has closed and its handler has finished
    ///
    /// Output written by the handler, including the final flush of any
    /// sinks, is complete when this resolves.
    pub async fn closed(&self) {
        self.inner.finished.cancelled().await
    }

    /// Wait until the connection is closed or asked to close
    pub(crate) async fn closing(&self) {
        self.inner.closing.cancelled().await
    }

    /// Write one frame to `tag`
    pub fn send_channel(&self, tag: ChannelTag, payload: &[u8]) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        tracing::trace!("Sending {} bytes on {}", payload.len(), tag);
        self.inner.transport.send(encode_frame(tag, payload))
    }

    /// Write one resize frame
    pub fn send_resize(&self, size: TerminalSize) -> Result<(), ConnectionError> {
        tracing::debug!("Sending terminal size {}x{}", size.width, size.height);
        self.send_channel(ChannelTag::Resize, &size.encode())
    }

    /// Close the connection
    pub fn close(&self) {
        if self.mark_closed() {
            tracing::debug!("Closing connection");
            self.inner.transport.close();
        }
    }

    pub(crate) fn mark_open(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Open;
                true
            } else {
                false
            }
        });
    }

    /// Transition to `Closed`; returns false if already closed
    pub(crate) fn mark_closed(&self) -> bool {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });
        if changed {
            self.inner.closing.cancel();
        }
        changed
    }

    /// Signal that no handler will run for this connection again
    pub(crate) fn mark_finished(&self) {
        self.inner.finished.cancel();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .finish()
    }
}
