//! Outbound message sink

use async_trait::async_trait;
use pc_protocol::Message;
use tokio::sync::mpsc;

use crate::error::AgentError;

/// Where an agent's outbound messages go
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), AgentError>;
}

#[async_trait]
impl MessageSink for mpsc::Sender<Message> {
    async fn send(&self, message: Message) -> Result<(), AgentError> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| AgentError::ChannelClosed)
    }
}
