//! Outbound connection to the orchestrator
//!
//! Connects over TCP, registers the participant and hands back an
//! `ActiveTunnel` that splits the stream into a frame reader and a writer
//! task stamping sequence numbers.

use std::time::Duration;

use futures::SinkExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;

use pc_core::config::AgentConfig;
use pc_core::error::ConnectionError;
use pc_core::HostInfo;
use pc_protocol::{
    Frame, FrameCodec, FrameReader, Message, ParticipantId, ReadOutcome, ScenarioConfig,
    PROTOCOL_VERSION,
};

use super::reconnect::LinearBackoff;

/// Outbound queue depth.
///
/// Holds progress, results and metrics between producers and the socket.
/// The agent produces at most a few messages per second.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// How long `close` waits for queued messages to drain
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Establishes the connection to the orchestrator
pub struct TunnelConnector {
    /// Agent configuration
    config: AgentConfig,
    /// Identity to register as
    participant: ParticipantId,
}

impl TunnelConnector {
    /// Create a new tunnel connector
    pub fn new(config: AgentConfig, participant: ParticipantId) -> Self {
        Self {
            config,
            participant,
        }
    }

    /// Connect to the orchestrator, retrying within the backoff budget
    ///
    /// A rejected registration is returned immediately without retrying.
    pub async fn connect_with_retry(
        &self,
        mut backoff: LinearBackoff,
    ) -> Result<ActiveTunnel, ConnectionError> {
        loop {
            tracing::info!(
                "Connecting to {} (attempt {}/{})",
                self.config.orchestrator_address,
                backoff.attempts() + 1,
                backoff.max_attempts()
            );

            match self.try_connect().await {
                Ok(tunnel) => {
                    tracing::info!(
                        "Connected to orchestrator at {}",
                        self.config.orchestrator_address
                    );
                    return Ok(tunnel);
                }
                Err(ConnectionError::Rejected(reason)) => {
                    // Retrying would be rejected the same way
                    tracing::error!("Registration rejected: {}", reason);
                    return Err(ConnectionError::Rejected(reason));
                }
                Err(e) => match backoff.next_delay() {
                    Some(delay) => {
                        tracing::warn!("Connection failed: {}. Retrying in {:?}", e, delay);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!("Connection failed: {}. Max retries reached", e);
                        return Err(ConnectionError::RetriesExhausted {
                            attempts: backoff.attempts(),
                        });
                    }
                },
            }
        }
    }

    /// Attempt a single connection and registration
    async fn try_connect(&self) -> Result<ActiveTunnel, ConnectionError> {
        let address = &self.config.orchestrator_address;

        tracing::debug!("Connecting to {}", address);
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ConnectionError::Timeout("connection"))?
            .map_err(|e| ConnectionError::Refused(format!("{}: {}", address, e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let mut tunnel = ActiveTunnel::new(stream);

        let host = HostInfo::local(Some(PROTOCOL_VERSION.to_string()));
        tunnel
            .send(Message::Register {
                participant: self.participant,
                hostname: host.hostname,
                os: host.os,
                arch: host.arch,
                version: host.version,
            })
            .await?;

        let (accepted, message) =
            tokio::time::timeout(self.config.connect_timeout, tunnel.await_ack())
                .await
                .map_err(|_| ConnectionError::Timeout("registration ack"))??;

        if !accepted {
            tunnel.close().await;
            return Err(ConnectionError::Rejected(message));
        }

        tracing::info!("Registered as {}: {}", self.participant, message);
        Ok(tunnel)
    }
}

/// Commands and conditions surfaced to the agent loop
#[derive(Debug, Clone, PartialEq)]
pub enum TunnelEvent {
    /// Run a scenario
    Start { run_id: u64, config: ScenarioConfig },
    /// Cancel the current run
    Stop,
    /// Connection closed or failed
    Disconnected(String),
}

/// An established, registered connection
pub struct ActiveTunnel {
    /// Incoming frames
    reader: FrameReader<OwnedReadHalf>,
    /// Queue to the writer task
    outbound: mpsc::Sender<Message>,
    /// Writer task handle
    writer: JoinHandle<()>,
    /// Highest sequence number accepted from the orchestrator
    last_seq: u32,
}

impl ActiveTunnel {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let writer = tokio::spawn(write_loop(write_half, outbound_rx));

        Self {
            reader: FrameReader::new(read_half),
            outbound,
            writer,
            last_seq: 0,
        }
    }

    /// Handle for sending messages from other tasks
    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.outbound.clone()
    }

    /// Queue a message to the orchestrator
    pub async fn send(&self, message: Message) -> Result<(), ConnectionError> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| ConnectionError::Lost("writer closed".to_string()))
    }

    /// Next accepted frame, skipping stale and malformed ones
    async fn next_message(&mut self) -> Result<Message, ConnectionError> {
        loop {
            match self.reader.next().await {
                Ok(ReadOutcome::Frame(frame)) => {
                    if frame.seq <= self.last_seq {
                        tracing::warn!(
                            "Dropping out-of-order frame {} (last {})",
                            frame.seq,
                            self.last_seq
                        );
                        continue;
                    }
                    self.last_seq = frame.seq;
                    tracing::debug!("Received {:?}", frame.message.message_type());
                    return Ok(frame.message);
                }
                Ok(ReadOutcome::Malformed(e)) => {
                    tracing::warn!("Malformed frame from orchestrator: {}", e);
                }
                Ok(ReadOutcome::Closed) => {
                    return Err(ConnectionError::Lost("closed by orchestrator".to_string()));
                }
                Err(e) => return Err(ConnectionError::Lost(e.to_string())),
            }
        }
    }

    /// Wait for the registration acknowledgment
    async fn await_ack(&mut self) -> Result<(bool, String), ConnectionError> {
        loop {
            match self.next_message().await? {
                Message::RegisterAck { accepted, message } => return Ok((accepted, message)),
                Message::Error { code, message } => {
                    tracing::warn!("Orchestrator error during registration: {:?} {}", code, message);
                }
                other => {
                    tracing::debug!(
                        "Ignoring {:?} before registration ack",
                        other.message_type()
                    );
                }
            }
        }
    }

    /// Receive the next event from the orchestrator
    pub async fn recv_event(&mut self) -> TunnelEvent {
        loop {
            let message = match self.next_message().await {
                Ok(message) => message,
                Err(e) => return TunnelEvent::Disconnected(e.to_string()),
            };

            match message {
                Message::ScenarioStart { run_id, config } => {
                    return TunnelEvent::Start { run_id, config };
                }
                Message::ScenarioStop => return TunnelEvent::Stop,
                Message::Error { code, message } => {
                    tracing::warn!("Orchestrator reported {:?}: {}", code, message);
                }
                Message::RegisterAck { message, .. } => {
                    tracing::debug!("Repeated registration ack: {}", message);
                }
                other => {
                    tracing::warn!(
                        "Unexpected message from orchestrator: {:?}",
                        other.message_type()
                    );
                }
            }
        }
    }

    /// Flush queued messages and close the connection
    pub async fn close(self) {
        drop(self.outbound);
        match tokio::time::timeout(CLOSE_TIMEOUT, self.writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Writer task ended abnormally: {}", e),
            Err(_) => tracing::debug!("Writer still busy after {:?}; abandoning it", CLOSE_TIMEOUT),
        }
    }
}

/// Encode and write queued messages, numbering frames from 1
async fn write_loop(write_half: OwnedWriteHalf, mut outbound: mpsc::Receiver<Message>) {
    let mut sink = FramedWrite::new(write_half, FrameCodec::new());
    let mut seq: u32 = 0;

    while let Some(message) = outbound.recv().await {
        seq = seq.wrapping_add(1);
        tracing::trace!("Frame {}: {:?}", seq, message.message_type());
        if let Err(e) = sink.send(Frame::new(seq, message)).await {
            tracing::error!("Failed to write to orchestrator: {}", e);
            break;
        }
    }
}
