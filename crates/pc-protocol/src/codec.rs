//! Tokio codec for framed protocol messages

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::frame::{FrameHeader, MAX_PAYLOAD_SIZE};
use crate::message::Message;

/// A complete frame with header and payload
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Sender sequence number
    pub seq: u32,
    /// The message payload
    pub message: Message,
}

impl Frame {
    /// Create a new frame
    pub fn new(seq: u32, message: Message) -> Self {
        Self { seq, message }
    }
}

/// Codec for encoding/decoding protocol frames.
///
/// A frame is always consumed whole before its payload is interpreted, so
/// an unknown type or undecodable payload yields an error for that frame
/// only and the next call starts cleanly at the following header.
#[derive(Debug)]
pub struct FrameCodec {
    /// Current header being decoded (if any)
    pending_header: Option<FrameHeader>,
    /// Largest payload accepted in either direction
    max_payload: usize,
}

impl FrameCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            pending_header: None,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }

    /// Create a codec with a tighter payload limit
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            pending_header: None,
            max_payload: max_payload.min(MAX_PAYLOAD_SIZE),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match FrameHeader::decode(src) {
                Some(h) => h,
                None => return Ok(None),
            },
        };

        let payload_len = header.payload_length as usize;
        if payload_len > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload,
            });
        }

        if src.len() < payload_len {
            src.reserve(payload_len - src.len());
            self.pending_header = Some(header);
            return Ok(None);
        }

        let payload_bytes = src.split_to(payload_len).freeze();

        let announced = header.message_type()?;
        let message: Message = bincode::deserialize(&payload_bytes)?;
        let actual = message.message_type();
        if actual != announced {
            return Err(ProtocolError::TypeMismatch {
                header: announced,
                payload: actual,
            });
        }

        Ok(Some(Frame {
            seq: header.seq,
            message,
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&frame.message)?;
        let payload_len = payload.len();

        if payload_len > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload,
            });
        }

        let header = FrameHeader::new(frame.seq, frame.message.message_type(), payload_len as u32);
        header.encode(dst);
        dst.extend_from_slice(&payload);

        Ok(())
    }
}
