//! Protocol error types

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unknown message type byte in a frame header
    #[error("Unknown message type: {0:#04x}")]
    UnknownMessageType(u8),

    /// Header announced one message type, payload decoded as another
    #[error("Message type mismatch: header says {header:?}, payload is {payload:?}")]
    TypeMismatch {
        header: crate::message::MessageType,
        payload: crate::message::MessageType,
    },

    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Participant name outside the closed set
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the stream can no longer be trusted after this error.
    ///
    /// Per-frame errors leave the frame boundary intact, so the connection
    /// can keep going. Oversized frames and I/O failures cannot be skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::PayloadTooLarge { .. } | ProtocolError::Io(_))
    }
}
