//! Protocol error types

use thiserror::Error;

/// Errors that can occur while interpreting frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Channel tag outside the known set
    #[error("Unknown stream: {0}")]
    UnknownStream(u8),

    /// Message with no tag byte
    #[error("Empty frame: every message must carry a channel tag")]
    EmptyFrame,

    /// Malformed JSON on the status or resize channel
    #[error("Failed to parse channel payload: {0}")]
    Parse(#[from] serde_json::Error),
}
