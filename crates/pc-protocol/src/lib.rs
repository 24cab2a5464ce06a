//! pc-protocol: Wire protocol for the performance championship
//!
//! This crate defines the binary protocol spoken between measurement agents
//! and the orchestrator over plain TCP: participant identifiers, primitive
//! metric values, the message set, the frame header and a tokio codec.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod participant;
pub mod reader;
pub mod value;

pub use codec::{Frame, FrameCodec};
pub use error::ProtocolError;
pub use frame::{FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{
    ErrorCode, Measurement, Message, MessageType, ResultPayload, ScenarioConfig,
    PROTOCOL_VERSION,
};
pub use participant::ParticipantId;
pub use reader::{FrameReader, ReadOutcome};
pub use value::{Metrics, Params, Primitive};
