//! Binding local I/O to a multiplexed connection
//!
//! One [`Binder::bind`] call is one attach or exec operation with its own
//! connection. Inbound stdout/stderr frames are written to the caller's
//! sinks; local input chunks and resize events are sent as stdin and
//! resize frames. The end of local input closes the connection.

use std::fmt;
use std::io::{self, Write};

use tokio::sync::watch;

use ks_core::KsError;
use ks_protocol::{ChannelTag, Status};

use crate::connection::Connection;
use crate::handler::{handle_standard_streams, HandlerAction, StreamHandler};
use crate::input::{InputEvent, InputSource};
use crate::multiplexer::Multiplexer;
use crate::target::{StreamFlags, Target};

/// Local sink for an output stream
pub type Sink = Box<dyn Write + Send>;

/// Local endpoints for one operation
///
/// Every endpoint is optional; only supplied endpoints are requested from
/// the server.
#[derive(Default)]
pub struct StreamOptions {
    pub stdout: Option<Sink>,
    pub stderr: Option<Sink>,
    pub stdin: Option<InputSource>,
    pub tty: bool,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, sink: impl Write + Send + 'static) -> Self {
        self.stdout = Some(Box::new(sink));
        self
    }

    pub fn stderr(mut self, sink: impl Write + Send + 'static) -> Self {
        self.stderr = Some(Box::new(sink));
        self
    }

    pub fn stdin(mut self, source: InputSource) -> Self {
        self.stdin = Some(source);
        self
    }

    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Stream flags derived from which endpoints are present
    pub fn flags(&self) -> StreamFlags {
        StreamFlags {
            stdout: self.stdout.is_some(),
            stderr: self.stderr.is_some(),
            stdin: self.stdin.is_some(),
            tty: self.tty,
        }
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("flags", &self.flags())
            .finish()
    }
}

/// Handler writing server output to local sinks
struct SinkHandler {
    stdout: Sink,
    stderr: Sink,
    status: watch::Sender<Option<Status>>,
}

impl StreamHandler for SinkHandler {
    fn on_binary(&mut self, tag: u8, payload: &[u8]) -> HandlerAction {
        // Resize is client-to-server only.
        if tag == ChannelTag::Resize.as_u8() {
            tracing::debug!("Ignoring inbound resize frame");
            return HandlerAction::Continue;
        }

        match handle_standard_streams(tag, payload, &mut *self.stdout, &mut *self.stderr) {
            Ok(Some(status)) => {
                tracing::debug!(
                    "Received status: {}",
                    status.message.as_deref().unwrap_or("<no message>")
                );
                self.status.send_replace(Some(status));
                HandlerAction::Continue
            }
            Ok(None) => HandlerAction::Continue,
            Err(KsError::Io(e)) => {
                tracing::error!("Failed to write to local sink: {}", e);
                HandlerAction::Close
            }
            Err(e) => {
                tracing::warn!("Dropping frame: {}", e);
                HandlerAction::Continue
            }
        }
    }

    fn on_close(&mut self) {
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();
    }
}

/// Creates one bound connection per attach/exec operation
#[derive(Clone)]
pub struct Binder {
    multiplexer: Multiplexer,
}

impl Binder {
    pub fn new(multiplexer: Multiplexer) -> Self {
        Self { multiplexer }
    }

    /// Attach to the main process of `container`
    pub async fn attach(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        options: StreamOptions,
    ) -> Result<BoundStream, KsError> {
        self.bind(&Target::attach(namespace, pod, container), options)
            .await
    }

    /// Run `command` in `container`
    pub async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[String],
        options: StreamOptions,
    ) -> Result<BoundStream, KsError> {
        let target = Target::exec(namespace, pod, container, command.iter().cloned());
        self.bind(&target, options).await
    }

    /// Open a connection for `target` and wire `options` to it
    ///
    /// Resolves once the connection is open, the initial terminal size has
    /// been sent and the input subscription is running. It does not wait
    /// for the remote process to finish.
    pub async fn bind(
        &self,
        target: &Target,
        options: StreamOptions,
    ) -> Result<BoundStream, KsError> {
        let path = target.request_path(&options.flags());
        let StreamOptions {
            stdout,
            stderr,
            stdin,
            ..
        } = options;

        let (status_tx, status_rx) = watch::channel(None);
        let handler = SinkHandler {
            stdout: stdout.unwrap_or_else(|| Box::new(io::sink())),
            stderr: stderr.unwrap_or_else(|| Box::new(io::sink())),
            status: status_tx,
        };

        let connection = self.multiplexer.connect(&path, handler).await?;

        if let Some(source) = stdin {
            if let Some(size) = source.size() {
                if let Err(e) = connection.send_resize(size) {
                    connection.close();
                    return Err(e.into());
                }
            }
            tokio::spawn(pump_input(connection.clone(), source));
        }

        Ok(BoundStream {
            connection,
            status: status_rx,
        })
    }
}

/// Forward local input to the connection until input ends or it closes
async fn pump_input(connection: Connection, mut source: InputSource) {
    loop {
        let event = tokio::select! {
            biased;
            _ = connection.closing() => return,
            event = source.recv() => event,
        };

        match event {
            InputEvent::Data(chunk) => {
                if let Err(e) = connection.send_channel(ChannelTag::Stdin, &chunk) {
                    tracing::debug!("Stopped forwarding input: {}", e);
                    return;
                }
            }
            InputEvent::Resize(size) => {
                if !source.is_resizable() {
                    tracing::debug!("Ignoring resize from a source without a terminal");
                    continue;
                }
                source.set_size(size);
                if let Err(e) = connection.send_resize(size) {
                    tracing::debug!("Stopped forwarding input: {}", e);
                    return;
                }
            }
            InputEvent::End => {
                tracing::debug!("Local input ended, closing connection");
                connection.close();
                return;
            }
        }
    }
}

/// A running attach/exec operation
#[derive(Debug)]
pub struct BoundStream {
    connection: Connection,
    status: watch::Receiver<Option<Status>>,
}

impl BoundStream {
    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Latest status received on the status channel
    pub fn status(&self) -> Option<Status> {
        self.status.borrow().clone()
    }

    /// Wait for the connection to close, then return the final status
    ///
    /// The output sinks have been flushed when this resolves.
    pub async fn wait(&self) -> Option<Status> {
        self.connection.closed().await;
        self.status()
    }

    /// Close the connection
    pub fn close(&self) {
        self.connection.close();
    }
}
