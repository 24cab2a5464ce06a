//! Per-agent session handler
//!
//! One reader loop per connection plus a writer task that owns the socket's
//! write half and stamps outgoing frames with sequence numbers. Commands
//! from the coordinator arrive on the session's command channel and are
//! forwarded to the writer.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use pc_core::ipc::IpcEvent;
use pc_core::time::current_time_millis;
use pc_core::{ConnectionStatus, HostInfo};
use pc_protocol::{
    ErrorCode, Frame, FrameCodec, FrameReader, Message, ParticipantId, ReadOutcome,
    PROTOCOL_VERSION,
};

use crate::connection::{AgentCommand, AgentLink};
use crate::relay::relay_metrics;
use crate::state::OrchestratorState;

/// Outbound queue depth per session
const OUTBOUND_CAPACITY: usize = 256;
/// Command queue depth per session
const COMMAND_CAPACITY: usize = 64;

/// Whether the session continues after a frame
enum Flow {
    Continue,
    Close,
}

/// Handler for a single agent connection
pub struct AgentSession {
    /// Shared orchestrator state
    state: Arc<OrchestratorState>,
    /// Peer address of the connecting agent
    peer_addr: SocketAddr,
    /// Pool id of this session
    connection_id: u64,
    /// Participant this session registered as
    participant: Option<ParticipantId>,
    /// Highest sequence number accepted so far
    last_seq: u32,
    /// Queue to the writer task (set once running)
    outbound: Option<mpsc::Sender<Message>>,
    /// Handle to the command processor task
    command_processor_handle: Option<tokio::task::JoinHandle<()>>,
    /// Cancelled on shutdown or when a newer session replaces this one
    cancel: CancellationToken,
}

impl AgentSession {
    pub fn new(
        state: Arc<OrchestratorState>,
        peer_addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Self {
        let connection_id = state.connections.next_connection_id();
        Self {
            state,
            peer_addr,
            connection_id,
            participant: None,
            last_seq: 0,
            outbound: None,
            command_processor_handle: None,
            cancel,
        }
    }

    /// Drive the connection until it closes
    pub async fn run(mut self, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(write_loop(write_half, outbound_rx, self.peer_addr));
        self.outbound = Some(outbound_tx);

        loop {
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Session {} for {} cancelled", self.connection_id, self.peer_addr);
                    break;
                }
                outcome = reader.next() => outcome,
            };

            match outcome {
                Ok(ReadOutcome::Frame(frame)) => {
                    if let Flow::Close = self.handle_frame(frame).await {
                        break;
                    }
                }
                Ok(ReadOutcome::Malformed(e)) => {
                    tracing::warn!("Malformed frame from {}: {}", self.peer_addr, e);
                    self.send_error(ErrorCode::InvalidMessage, e.to_string()).await;
                }
                Ok(ReadOutcome::Closed) => {
                    tracing::info!("Connection from {} closed", self.peer_addr);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Connection from {} failed: {}", self.peer_addr, e);
                    break;
                }
            }
        }

        self.cleanup();

        // Let queued frames (e.g. a rejection) reach the peer
        if let Err(e) = writer.await {
            tracing::debug!("Writer task for {} ended abnormally: {}", self.peer_addr, e);
        }
    }

    /// Process a decoded frame
    async fn handle_frame(&mut self, frame: Frame) -> Flow {
        if frame.seq <= self.last_seq {
            tracing::warn!(
                "Dropping out-of-order frame {} from {} (last {})",
                frame.seq,
                self.peer_addr,
                self.last_seq
            );
            return Flow::Continue;
        }
        self.last_seq = frame.seq;
        tracing::debug!(
            "Frame {} from {}: {:?}",
            frame.seq,
            self.peer_addr,
            frame.message.message_type()
        );

        if let Message::Register {
            participant,
            hostname,
            os,
            arch,
            version,
        } = frame.message
        {
            let host = HostInfo {
                hostname,
                os,
                arch,
                version,
            };
            return self.handle_register(participant, host).await;
        }

        let Some(registered) = self.participant else {
            self.send_error(ErrorCode::NotRegistered, "register first".into())
                .await;
            return Flow::Continue;
        };

        if let Some(claimed) = frame.message.participant() {
            if claimed != registered {
                tracing::warn!(
                    "Session registered as {} sent a message as {}",
                    registered,
                    claimed
                );
                self.send_error(
                    ErrorCode::ParticipantMismatch,
                    format!("registered as {}", registered),
                )
                .await;
                return Flow::Continue;
            }
        }

        match frame.message {
            Message::MetricsSample {
                participant,
                metrics,
                timestamp,
            } => {
                relay_metrics(&self.state, participant, metrics, timestamp).await;
            }

            Message::ScenarioProgress {
                participant,
                scenario,
                run_id,
                step,
                total_steps,
            } => {
                self.mark_seen(participant);
                self.state
                    .handle_progress(participant, &scenario, run_id, step, total_steps)
                    .await;
            }

            Message::ScenarioResult {
                participant,
                scenario,
                run_id,
                result,
            } => {
                self.mark_seen(participant);
                self.state
                    .handle_result(participant, &scenario, run_id, result)
                    .await;
            }

            Message::Error { code, message } => {
                self.mark_seen(registered);
                tracing::warn!("{} reported error {:?}: {}", registered, code, message);
            }

            other => {
                tracing::warn!(
                    "Unexpected message type from {}: {:?}",
                    registered,
                    other.message_type()
                );
                self.send_error(
                    ErrorCode::InvalidMessage,
                    format!("{:?} is not accepted from agents", other.message_type()),
                )
                .await;
            }
        }

        Flow::Continue
    }

    async fn handle_register(&mut self, participant: ParticipantId, host: HostInfo) -> Flow {
        if let Some(current) = self.participant {
            if current != participant {
                self.send_error(
                    ErrorCode::ParticipantMismatch,
                    format!("registered as {}", current),
                )
                .await;
                return Flow::Continue;
            }
        }

        if !self.state.is_expected(participant) {
            tracing::warn!("Rejecting {} from {}: not expected", participant, self.peer_addr);
            self.send(Message::RegisterAck {
                accepted: false,
                message: format!("{} is not part of this championship", participant),
            })
            .await;
            return Flow::Close;
        }

        if host.version.as_deref() != Some(PROTOCOL_VERSION) {
            tracing::warn!(
                "{} speaks protocol {:?}, expected {}",
                participant,
                host.version,
                PROTOCOL_VERSION
            );
        }

        tracing::info!(
            "{} registered from {} ({}) - {} {}",
            participant,
            self.peer_addr,
            host.hostname,
            host.os,
            host.arch
        );

        // Link first: an older session closing concurrently then sees it
        // has been replaced
        if self.participant.is_none() {
            let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
            self.state.connections.insert(AgentLink::new(
                participant,
                self.connection_id,
                command_tx,
                self.cancel.clone(),
            ));
            self.participant = Some(participant);
            self.start_command_processor(command_rx);
        }

        let now = current_time_millis();
        if self
            .state
            .registry
            .register(participant, self.connection_id, host, now)
        {
            self.state.events.publish(IpcEvent::DeviceStatus {
                device: participant,
                status: ConnectionStatus::Connected,
                timestamp: now,
            });
        }

        self.send(Message::RegisterAck {
            accepted: true,
            message: self.state.welcome_message(participant),
        })
        .await;
        Flow::Continue
    }

    /// Refresh liveness for non-metrics traffic
    fn mark_seen(&self, participant: ParticipantId) {
        let now = current_time_millis();
        match self.state.registry.touch(participant, now) {
            Ok(true) => self.state.events.publish(IpcEvent::DeviceStatus {
                device: participant,
                status: ConnectionStatus::Connected,
                timestamp: now,
            }),
            Ok(false) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }

    async fn send(&self, message: Message) {
        if let Some(outbound) = &self.outbound {
            if outbound.send(message).await.is_err() {
                tracing::debug!("Writer for {} is gone", self.peer_addr);
            }
        }
    }

    async fn send_error(&self, code: ErrorCode, message: String) {
        self.send(Message::Error { code, message }).await;
    }

    /// Start a background task forwarding coordinator commands to the writer
    fn start_command_processor(&mut self, mut command_rx: mpsc::Receiver<AgentCommand>) {
        let Some(outbound) = self.outbound.clone() else {
            tracing::error!("No writer available for command processor");
            return;
        };
        let peer_addr = self.peer_addr;

        let task_handle = tokio::spawn(async move {
            tracing::debug!("Command processor started for {}", peer_addr);

            while let Some(command) = command_rx.recv().await {
                if outbound.send(command.to_message()).await.is_err() {
                    break;
                }
                tracing::debug!("Sent {:?} to {}", command, peer_addr);
            }

            tracing::debug!("Command processor stopped for {}", peer_addr);
        });

        self.command_processor_handle = Some(task_handle);
    }

    /// Deregister the session; the participant is only marked disconnected
    /// if no newer session took its place
    fn cleanup(&mut self) {
        if let Some(handle) = self.command_processor_handle.take() {
            handle.abort();
        }
        self.outbound = None;

        let Some(participant) = self.participant else {
            return;
        };
        if self
            .state
            .connections
            .remove_if_current(participant, self.connection_id)
            .is_none()
        {
            return;
        }
        if self
            .state
            .registry
            .mark_disconnected(participant, self.connection_id)
        {
            tracing::info!("{} disconnected", participant);
            self.state.events.publish(IpcEvent::DeviceStatus {
                device: participant,
                status: ConnectionStatus::Disconnected,
                timestamp: current_time_millis(),
            });
        }
    }
}

/// Encode and write queued messages, numbering frames from 1
async fn write_loop(
    write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Message>,
    peer_addr: SocketAddr,
) {
    let mut sink = FramedWrite::new(write_half, FrameCodec::new());
    let mut seq: u32 = 0;

    while let Some(message) = outbound.recv().await {
        seq = seq.wrapping_add(1);
        tracing::trace!("Frame {} to {}: {:?}", seq, peer_addr, message.message_type());
        if let Err(e) = sink.send(Frame::new(seq, message)).await {
            tracing::error!("Failed to write to {}: {}", peer_addr, e);
            break;
        }
    }
}
