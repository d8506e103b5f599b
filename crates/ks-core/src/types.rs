//! Core domain types

use std::fmt;

/// Lifecycle of one multiplexed connection
///
/// `Closed` is terminal; a new operation always starts from `Idle` with
/// a fresh connection. `Idle` describes an operation with no connection
/// yet, so a live connection handle reports `Connecting` or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection requested yet
    Idle,
    /// Waiting for the handshake to complete
    Connecting,
    /// Open and exchanging frames
    Open,
    /// Closed, locally or remotely
    Closed,
}

impl ConnectionState {
    /// Whether the state is terminal
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Open), "open");
        assert_eq!(format!("{}", ConnectionState::Closed), "closed");
    }

    #[test]
    fn test_only_closed_is_terminal() {
        assert!(ConnectionState::Closed.is_closed());
        assert!(!ConnectionState::Open.is_closed());
        assert!(!ConnectionState::Connecting.is_closed());
    }
}
