//! Inbound frame handlers

use std::io::Write;

use ks_core::{ConnectionError, KsError};
use ks_protocol::{ChannelTag, ProtocolError, Status};

/// What the multiplexer should do after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// Keep the connection open
    Continue,
    /// Close the connection
    Close,
}

/// Receives the demultiplexed events of one connection
///
/// All methods run on the connection's event loop, one event at a time,
/// in arrival order.
pub trait StreamHandler: Send + 'static {
    /// A text message arrived
    fn on_text(&mut self, _text: &str) -> HandlerAction {
        HandlerAction::Continue
    }

    /// A binary frame arrived; `tag` is the raw channel byte
    fn on_binary(&mut self, tag: u8, payload: &[u8]) -> HandlerAction;

    /// The transport reported an error after the connection opened
    fn on_error(&mut self, error: &ConnectionError) -> HandlerAction {
        tracing::warn!("Stream error: {}", error);
        HandlerAction::Continue
    }

    /// The connection closed
    fn on_close(&mut self) {}
}

type TextFn = Box<dyn FnMut(&str) -> HandlerAction + Send>;
type BinaryFn = Box<dyn FnMut(u8, &[u8]) -> HandlerAction + Send>;
type ErrorFn = Box<dyn FnMut(&ConnectionError) -> HandlerAction + Send>;

/// Closure-based handler; events without a callback are ignored
#[derive(Default)]
pub struct Callbacks {
    text: Option<TextFn>,
    binary: Option<BinaryFn>,
    error: Option<ErrorFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) -> HandlerAction + Send + 'static,
    {
        self.text = Some(Box::new(f));
        self
    }

    pub fn with_binary<F>(mut self, f: F) -> Self
    where
        F: FnMut(u8, &[u8]) -> HandlerAction + Send + 'static,
    {
        self.binary = Some(Box::new(f));
        self
    }

    pub fn with_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ConnectionError) -> HandlerAction + Send + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }
}

impl StreamHandler for Callbacks {
    fn on_text(&mut self, text: &str) -> HandlerAction {
        match self.text.as_mut() {
            Some(f) => f(text),
            None => HandlerAction::Continue,
        }
    }

    fn on_binary(&mut self, tag: u8, payload: &[u8]) -> HandlerAction {
        match self.binary.as_mut() {
            Some(f) => f(tag, payload),
            None => HandlerAction::Continue,
        }
    }

    fn on_error(&mut self, error: &ConnectionError) -> HandlerAction {
        match self.error.as_mut() {
            Some(f) => f(error),
            None => HandlerAction::Continue,
        }
    }
}

/// Route one server frame to the matching local sink
///
/// Stdout and stderr payloads are appended to their sink (an empty
/// payload writes nothing). A status payload is parsed and returned
/// without touching either sink. Any other tag is rejected with
/// [`ProtocolError::UnknownStream`].
pub fn handle_standard_streams(
    tag: u8,
    payload: &[u8],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Option<Status>, KsError> {
    match ChannelTag::from_u8(tag) {
        Some(ChannelTag::Stdout) => {
            if !payload.is_empty() {
                stdout.write_all(payload)?;
            }
            Ok(None)
        }
        Some(ChannelTag::Stderr) => {
            if !payload.is_empty() {
                stderr.write_all(payload)?;
            }
            Ok(None)
        }
        Some(ChannelTag::Status) => Ok(Some(Status::decode(payload)?)),
        _ => Err(ProtocolError::UnknownStream(tag).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stream() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = handle_standard_streams(10, &[20; 30], &mut out, &mut err);
        let error = result.unwrap_err();
        assert!(matches!(
            error,
            KsError::Protocol(ProtocolError::UnknownStream(10))
        ));
        assert!(error.to_string().contains("Unknown stream: 10"));
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn test_client_channels_are_not_inbound() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        for tag in [ChannelTag::Stdin, ChannelTag::Resize] {
            let result = handle_standard_streams(tag.as_u8(), b"x", &mut out, &mut err);
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_status_returns_without_writing() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let payload = br#"{"message":"Some message","reason":"Some Reason"}"#;
        let status = handle_standard_streams(3, payload, &mut out, &mut err)
            .unwrap()
            .unwrap();
        assert_eq!(status.reason.as_deref(), Some("Some Reason"));
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_malformed_status() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = handle_standard_streams(3, b"not json", &mut out, &mut err);
        assert!(matches!(
            result,
            Err(KsError::Protocol(ProtocolError::Parse(_)))
        ));
    }

    #[test]
    fn test_empty_payload_is_noop() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = handle_standard_streams(1, &[], &mut out, &mut err).unwrap();
        assert!(result.is_none());
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_output_streams() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        handle_standard_streams(1, &[1; 1024], &mut out, &mut err).unwrap();
        assert_eq!(out.len(), 1024);
        assert!(err.is_empty());

        handle_standard_streams(2, &[2; 512], &mut out, &mut err).unwrap();
        assert_eq!(out.len(), 1024);
        assert_eq!(err.len(), 512);

        assert!(out.iter().all(|b| *b == 1));
        assert!(err.iter().all(|b| *b == 2));
    }

    #[test]
    fn test_callbacks_default_to_continue() {
        let mut callbacks = Callbacks::new();
        assert_eq!(callbacks.on_text("ignored"), HandlerAction::Continue);
        assert_eq!(callbacks.on_binary(1, b"ignored"), HandlerAction::Continue);
        assert_eq!(
            callbacks.on_error(&ConnectionError::Transport("boom".to_string())),
            HandlerAction::Continue
        );
    }
}
