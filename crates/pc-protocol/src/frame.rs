//! Frame header encoding/decoding
//!
//! The frame format uses an 8-byte header:
//! - seq: 4 bytes (u32, big-endian), per-sender sequence number
//! - message_type: 1 byte (u8)
//! - payload_length: 3 bytes (u24, big-endian, max 16MB)

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::message::MessageType;

/// Size of the frame header in bytes
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size (16MB - 1, limited by 24-bit length field)
pub const MAX_PAYLOAD_SIZE: usize = 0x00FF_FFFF;

/// Frame header containing ordering and length information.
///
/// The message type is kept as the raw byte so a frame with an unknown
/// type can still be skipped by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Sender-assigned sequence number, starting at 1 per connection
    pub seq: u32,
    /// Raw message type byte
    pub type_byte: u8,
    /// Length of the payload in bytes
    pub payload_length: u32,
}

impl FrameHeader {
    /// Create a new frame header
    pub fn new(seq: u32, message_type: MessageType, payload_length: u32) -> Self {
        Self {
            seq,
            type_byte: message_type.as_u8(),
            payload_length,
        }
    }

    /// Interpret the type byte
    pub fn message_type(&self) -> Result<MessageType, ProtocolError> {
        MessageType::from_u8(self.type_byte)
            .ok_or(ProtocolError::UnknownMessageType(self.type_byte))
    }

    /// Encode the header into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32(self.seq);
        dst.put_u8(self.type_byte);
        // payload_length: 3 bytes big-endian (24-bit)
        dst.put_u8((self.payload_length >> 16) as u8);
        dst.put_u16(self.payload_length as u16);
    }

    /// Decode a header from a byte buffer
    ///
    /// Returns None if there aren't enough bytes in the buffer.
    pub fn decode(src: &mut BytesMut) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }

        let seq = src.get_u32();
        let type_byte = src.get_u8();
        let len_high = src.get_u8() as u32;
        let len_low = src.get_u16() as u32;
        let payload_length = (len_high << 16) | len_low;

        Some(Self {
            seq,
            type_byte,
            payload_length,
        })
    }
}
