//! Local input sources
//!
//! An input source is a queue of [`InputEvent`]s fed by the caller. A
//! source that knows its terminal size is resize-capable: the binder sends
//! that size when the connection opens and forwards later resize events.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use ks_protocol::TerminalSize;

/// Events produced by a local input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A chunk of input, forwarded as one stdin frame
    Data(Bytes),
    /// The local terminal changed size
    Resize(TerminalSize),
    /// No more input
    End,
}

/// Readable local input, optionally with terminal dimensions
#[derive(Debug)]
pub struct InputSource {
    events: mpsc::Receiver<InputEvent>,
    size: Option<TerminalSize>,
}

impl InputSource {
    /// Data-only source
    pub fn new(events: mpsc::Receiver<InputEvent>) -> Self {
        Self { events, size: None }
    }

    /// Resize-capable source with its current dimensions
    pub fn with_size(events: mpsc::Receiver<InputEvent>, size: TerminalSize) -> Self {
        Self {
            events,
            size: Some(size),
        }
    }

    /// Data-only source and the sender that feeds it
    pub fn channel(capacity: usize) -> (mpsc::Sender<InputEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    /// Resize-capable source and the sender that feeds it
    pub fn resizable(capacity: usize, size: TerminalSize) -> (mpsc::Sender<InputEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::with_size(rx, size))
    }

    /// Source fed by a background task reading `reader` until EOF
    ///
    /// Each successful read becomes one `Data` event of at most
    /// `chunk_size` bytes. EOF or a read error ends the source.
    pub fn from_reader<R>(mut reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, source) = Self::channel(16);
        let chunk_size = chunk_size.max(1);

        tokio::spawn(async move {
            let mut buf = vec![0u8; chunk_size];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = Bytes::copy_from_slice(&buf[..n]);
                        if tx.send(InputEvent::Data(chunk)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read local input: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(InputEvent::End).await;
        });

        source
    }

    /// Current terminal dimensions, if resize-capable
    pub fn size(&self) -> Option<TerminalSize> {
        self.size
    }

    /// Whether this source reports terminal dimensions
    pub fn is_resizable(&self) -> bool {
        self.size.is_some()
    }

    /// Next event; a dropped sender reads as `End`
    pub(crate) async fn recv(&mut self) -> InputEvent {
        self.events.recv().await.unwrap_or(InputEvent::End)
    }

    pub(crate) fn set_size(&mut self, size: TerminalSize) {
        self.size = Some(size);
    }
}
