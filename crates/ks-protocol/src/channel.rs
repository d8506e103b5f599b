//! Channel tag identifiers
//!
//! The tag values are fixed by the remote endpoint and must never be
//! renumbered.

use std::fmt;

/// Logical stream carried inside a multiplexed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelTag {
    /// Process standard input (client → server)
    Stdin = 0,
    /// Process standard output (server → client)
    Stdout = 1,
    /// Process standard error (server → client)
    Stderr = 2,
    /// Final operation status as a JSON object (server → client)
    Status = 3,
    /// Terminal resize events as JSON (client → server)
    Resize = 4,
}

impl ChannelTag {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stdin),
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            3 => Some(Self::Status),
            4 => Some(Self::Resize),
            _ => None,
        }
    }

    /// Whether the server writes this channel
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Stdout | Self::Stderr | Self::Status)
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelTag::Stdin => "stdin",
            ChannelTag::Stdout => "stdout",
            ChannelTag::Stderr => "stderr",
            ChannelTag::Status => "status",
            ChannelTag::Resize => "resize",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_values_are_fixed() {
        assert_eq!(ChannelTag::Stdin.as_u8(), 0);
        assert_eq!(ChannelTag::Stdout.as_u8(), 1);
        assert_eq!(ChannelTag::Stderr.as_u8(), 2);
        assert_eq!(ChannelTag::Status.as_u8(), 3);
        assert_eq!(ChannelTag::Resize.as_u8(), 4);
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(ChannelTag::from_u8(5), None);
        assert_eq!(ChannelTag::from_u8(0xFF), None);
    }

    #[test]
    fn test_inbound_channels() {
        assert!(ChannelTag::Stdout.is_inbound());
        assert!(ChannelTag::Status.is_inbound());
        assert!(!ChannelTag::Stdin.is_inbound());
        assert!(!ChannelTag::Resize.is_inbound());
    }
}
