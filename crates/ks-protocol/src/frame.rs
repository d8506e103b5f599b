//! Frame encoding
//!
//! A frame is one complete transport message:
//! - channel tag: 1 byte
//! - payload: the rest of the message (may be empty)
//!
//! There is no length prefix; message boundaries come from the transport.

use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::ChannelTag;
use crate::error::ProtocolError;

/// Size of the channel tag prefix in bytes
pub const TAG_SIZE: usize = 1;

/// Build one outbound message: tag byte followed by the payload
pub fn encode_frame(tag: ChannelTag, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(TAG_SIZE + payload.len());
    buf.put_u8(tag.as_u8());
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// An inbound message split into its raw tag and payload
///
/// The tag is kept as a raw byte so that unknown tags can be reported
/// with their value by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw channel tag byte
    pub tag: u8,
    /// Payload with the tag stripped
    pub payload: Bytes,
}

impl Frame {
    /// Split a transport message into tag and payload
    pub fn split(mut message: Bytes) -> Result<Self, ProtocolError> {
        if message.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        let payload = message.split_off(TAG_SIZE);
        Ok(Self {
            tag: message[0],
            payload,
        })
    }

    /// The channel this frame belongs to, if the tag is known
    pub fn channel(&self) -> Option<ChannelTag> {
        ChannelTag::from_u8(self.tag)
    }
}
