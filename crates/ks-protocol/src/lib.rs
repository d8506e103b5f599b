//! ks-protocol: Wire protocol for multiplexed container streams
//!
//! Every message on the upgraded connection carries a one-byte channel
//! tag followed by the payload for that channel. This crate defines the
//! tags, the framing helpers and the JSON payloads carried on the resize
//! and status channels.

pub mod channel;
pub mod error;
pub mod frame;
pub mod message;

pub use channel::ChannelTag;
pub use error::ProtocolError;
pub use frame::{encode_frame, Frame, TAG_SIZE};
pub use message::{Status, StatusCause, StatusDetails, TerminalSize};
