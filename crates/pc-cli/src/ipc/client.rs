//! IPC client for communicating with the orchestrator
//!
//! Every observer connection receives broadcast events, so a response may
//! arrive after any number of events. Events read while waiting for a
//! response are queued and handed out by `next_event` in arrival order.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use pc_core::ipc::{
    default_ipc_address, CommentaryEntry, DeviceInfo, IpcEvent, IpcMessage, IpcRequest,
    IpcResponse, OrchestratorStatus, ScenarioInfo,
};
use pc_protocol::ParticipantId;

/// An accepted start request
#[derive(Debug, Clone)]
pub struct StartedDemo {
    pub scenario: String,
    pub run_id: u64,
    pub dispatched: Vec<ParticipantId>,
}

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

/// Client for communicating with the orchestrator
pub struct OrchestratorClient {
    address: String,
    conn: Option<Connection>,
    pending_events: VecDeque<IpcEvent>,
}

impl OrchestratorClient {
    /// Create a new client with default address
    pub fn new() -> Self {
        Self::with_address(default_ipc_address())
    }

    /// Create a new client with custom address
    pub fn with_address(address: String) -> Self {
        Self {
            address,
            conn: None,
            pending_events: VecDeque::new(),
        }
    }

    /// Get the address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Connect to the orchestrator if not already connected
    pub async fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        tracing::debug!("Connecting to orchestrator at {}", self.address);

        let stream = TcpStream::connect(&self.address).await.with_context(|| {
            format!(
                "Failed to connect to orchestrator at {}. Is it running?",
                self.address
            )
        })?;

        let (reader, writer) = stream.into_split();
        self.conn = Some(Connection {
            lines: BufReader::new(reader).lines(),
            writer,
        });
        Ok(())
    }

    /// Check if the orchestrator is running
    pub async fn ping(&mut self) -> Result<bool> {
        match self.send_request(IpcRequest::Ping).await {
            Ok(IpcResponse::Pong) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get orchestrator status
    pub async fn status(&mut self) -> Result<OrchestratorStatus> {
        match self.send_request(IpcRequest::GetStatus).await? {
            IpcResponse::Status(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// List participants
    pub async fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        match self.send_request(IpcRequest::ListDevices).await? {
            IpcResponse::Devices { devices } => Ok(devices),
            other => Err(unexpected(other)),
        }
    }

    /// List configured scenarios
    pub async fn scenarios(&mut self) -> Result<Vec<ScenarioInfo>> {
        match self.send_request(IpcRequest::ListScenarios).await? {
            IpcResponse::Scenarios { scenarios } => Ok(scenarios),
            other => Err(unexpected(other)),
        }
    }

    /// Get the commentary history
    pub async fn commentary(&mut self) -> Result<Vec<CommentaryEntry>> {
        match self.send_request(IpcRequest::GetCommentary).await? {
            IpcResponse::Commentary { entries } => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    /// Start a scenario
    pub async fn start_demo(&mut self, scenario: &str) -> Result<StartedDemo> {
        let request = IpcRequest::StartDemo {
            scenario: scenario.to_string(),
        };

        match self.send_request(request).await? {
            IpcResponse::DemoStarted {
                scenario,
                run_id,
                dispatched,
            } => Ok(StartedDemo {
                scenario,
                run_id,
                dispatched,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Abandon the current run
    pub async fn stop_demo(&mut self) -> Result<()> {
        self.expect_ok(IpcRequest::StopDemo).await
    }

    /// Force a verdict with the results collected so far
    pub async fn conclude_demo(&mut self) -> Result<()> {
        self.expect_ok(IpcRequest::ConcludeDemo).await
    }

    /// Shutdown the orchestrator
    pub async fn shutdown(&mut self) -> Result<()> {
        self.expect_ok(IpcRequest::Shutdown).await
    }

    /// Wait for the next broadcast event.
    ///
    /// Returns `None` once the orchestrator closes the connection.
    pub async fn next_event(&mut self) -> Result<Option<IpcEvent>> {
        if let Some(event) = self.pending_events.pop_front() {
            return Ok(Some(event));
        }

        self.connect().await?;
        loop {
            match self.read_message().await? {
                Some(IpcMessage::Event(event)) => return Ok(Some(event)),
                Some(other) => tracing::debug!("Ignoring unsolicited message: {:?}", other),
                None => return Ok(None),
            }
        }
    }

    async fn expect_ok(&mut self, request: IpcRequest) -> Result<()> {
        match self.send_request(request).await? {
            IpcResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Send a request and wait for its response.
    ///
    /// `Error` responses are turned into `Err`.
    async fn send_request(&mut self, request: IpcRequest) -> Result<IpcResponse> {
        self.connect().await?;

        let mut request_json = serde_json::to_string(&request)?;
        request_json.push('\n');

        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;
        conn.writer.write_all(request_json.as_bytes()).await?;

        loop {
            match self.read_message().await? {
                Some(IpcMessage::Response(IpcResponse::Error { message })) => {
                    anyhow::bail!("{}", message)
                }
                Some(IpcMessage::Response(response)) => return Ok(response),
                Some(IpcMessage::Event(event)) => self.pending_events.push_back(event),
                Some(IpcMessage::Request(_)) => {}
                None => anyhow::bail!("Orchestrator closed the connection"),
            }
        }
    }

    async fn read_message(&mut self) -> Result<Option<IpcMessage>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;

        loop {
            let Some(line) = conn.lines.next_line().await? else {
                self.conn = None;
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            match IpcMessage::from_bytes(line.as_bytes()) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => tracing::warn!("Skipping unreadable IPC line: {}", e),
            }
        }
    }
}

impl Default for OrchestratorClient {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(response: IpcResponse) -> anyhow::Error {
    anyhow::anyhow!("Unexpected response: {:?}", response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// One-shot fake orchestrator that replays canned lines after each request
    async fn fake_orchestrator(replies: Vec<Vec<String>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();

            for batch in replies {
                if lines.next_line().await.unwrap().is_none() {
                    return;
                }
                for line in batch {
                    writer.write_all(line.as_bytes()).await.unwrap();
                    writer.write_all(b"\n").await.unwrap();
                }
            }
        });

        address
    }

    fn json(message: impl Into<IpcMessage>) -> String {
        String::from_utf8(message.into().to_bytes().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_events_before_response_are_queued() {
        let stopped = IpcEvent::ScenarioStopped {
            scenario: Some("ai_showdown".into()),
            run_id: Some(1),
            timestamp: 5,
        };
        let address = fake_orchestrator(vec![vec![
            json(stopped.clone()),
            String::new(),
            json(IpcResponse::Ok),
        ]])
        .await;

        let mut client = OrchestratorClient::with_address(address);
        client.stop_demo().await.unwrap();

        assert_eq!(client.next_event().await.unwrap(), Some(stopped));
        assert_eq!(client.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_response_becomes_err() {
        let address = fake_orchestrator(vec![vec![json(IpcResponse::Error {
            message: "No scenario is running".into(),
        })]])
        .await;

        let mut client = OrchestratorClient::with_address(address);
        let err = client.conclude_demo().await.unwrap_err();
        assert_eq!(err.to_string(), "No scenario is running");
    }

    #[tokio::test]
    async fn test_garbage_lines_are_skipped() {
        let address = fake_orchestrator(vec![vec![
            "not json".to_string(),
            json(IpcResponse::Pong),
        ]])
        .await;

        let mut client = OrchestratorClient::with_address(address);
        assert!(client.ping().await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused_mentions_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut client = OrchestratorClient::with_address(address.clone());
        let err = client.status().await.unwrap_err();
        assert!(err.to_string().contains(&address));
    }
}
