//! Payload types for the JSON channels
//!
//! The resize channel carries `{"height":H,"width":W}` from the client.
//! The status channel carries a status object from the server once the
//! remote process has finished (or the operation has failed).

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Status value reported on success
pub const STATUS_SUCCESS: &str = "Success";

/// Reason reported when the remote process exited with a non-zero code
pub const REASON_NON_ZERO_EXIT: &str = "NonZeroExitCode";

/// Cause reason carrying the numeric exit code
pub const CAUSE_EXIT_CODE: &str = "ExitCode";

/// Terminal dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of rows
    pub height: u16,
    /// Number of columns
    pub width: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(height: u16, width: u16) -> Self {
        Self { height, width }
    }

    /// Serialize as the resize channel payload
    pub fn encode(&self) -> Vec<u8> {
        // Two integer fields cannot fail to serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Parse a resize channel payload
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// A single cause inside status details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Extended status data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
}

/// Operation outcome delivered on the status channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// "Success" or "Failure"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable reason, e.g. `NonZeroExitCode`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Suggested HTTP status code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl Status {
    /// Parse a status channel payload
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Whether the remote operation succeeded
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// Exit code of the remote process, when the status carries one
    pub fn exit_code(&self) -> Option<i32> {
        if self.is_success() {
            return Some(0);
        }
        if self.reason.as_deref() != Some(REASON_NON_ZERO_EXIT) {
            return None;
        }
        self.details
            .as_ref()?
            .causes
            .iter()
            .find(|cause| cause.reason.as_deref() == Some(CAUSE_EXIT_CODE))
            .and_then(|cause| cause.message.as_deref())
            .and_then(|code| code.trim().parse().ok())
    }
}
