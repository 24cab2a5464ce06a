//! Agent connection policy tests over real sockets

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use pc_agent::Agent;
use pc_core::config::{AgentConfig, OrchestratorConfig, Range, RetryConfig, ScenarioDefinition};
use pc_core::error::ConnectionError;
use pc_core::ipc::{IpcEvent, IpcRequest, IpcResponse};
use pc_orchestrator::Orchestrator;
use pc_protocol::{Frame, FrameCodec, FrameReader, Message, ParticipantId, ReadOutcome};

const WAIT: Duration = Duration::from_secs(10);

fn agent_config(address: String) -> AgentConfig {
    AgentConfig {
        orchestrator_address: address,
        retry: RetryConfig {
            max_attempts: 3,
            backoff_step: Duration::from_millis(10),
        },
        connect_timeout: Duration::from_secs(2),
        metrics_interval: Duration::from_millis(100),
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn test_retries_exhausted_against_closed_port() {
    // Reserve a port, then free it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let agent = Agent::new(agent_config(address), ParticipantId::Intel);
    let result = timeout(WAIT, agent.run(CancellationToken::new()))
        .await
        .expect("Agent kept retrying");

    assert!(matches!(
        result,
        Err(ConnectionError::RetriesExhausted { attempts: 3 })
    ));
}

#[tokio::test]
async fn test_rejected_registration_is_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&accepted);
    let server = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let (read_half, write_half) = stream.into_split();
            let mut reader = FrameReader::new(read_half);
            let mut writer = FramedWrite::new(write_half, FrameCodec::new());

            if let Ok(ReadOutcome::Frame(frame)) = reader.next().await {
                assert!(matches!(frame.message, Message::Register { .. }));
            }
            writer
                .send(Frame::new(
                    1,
                    Message::RegisterAck {
                        accepted: false,
                        message: "not today".into(),
                    },
                ))
                .await
                .unwrap();
        }
    });

    let agent = Agent::new(agent_config(address), ParticipantId::Snapdragon);
    let result = timeout(WAIT, agent.run(CancellationToken::new()))
        .await
        .expect("Agent did not give up");

    match result {
        Err(ConnectionError::Rejected(reason)) => assert_eq!(reason, "not today"),
        other => panic!("Expected Rejected, got {:?}", other),
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    server.abort();
}

#[tokio::test]
async fn test_cancel_while_connected_returns_ok() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        let mut writer = FramedWrite::new(write_half, FrameCodec::new());

        reader.next().await.unwrap();
        writer
            .send(Frame::new(
                1,
                Message::RegisterAck {
                    accepted: true,
                    message: "welcome".into(),
                },
            ))
            .await
            .unwrap();

        // Wait for the first metrics sample, then idle until the agent leaves
        let mut saw_metrics = false;
        while let Ok(ReadOutcome::Frame(frame)) = reader.next().await {
            if matches!(frame.message, Message::MetricsSample { .. }) {
                saw_metrics = true;
            }
        }
        saw_metrics
    });

    let cancel = CancellationToken::new();
    let agent = Agent::new(agent_config(address), ParticipantId::Intel);
    let run = tokio::spawn(agent.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    let result = timeout(WAIT, run).await.expect("Agent did not stop").unwrap();
    assert!(result.is_ok());
    assert!(timeout(WAIT, server).await.unwrap().unwrap());
}

/// Agents race a short scenario against a real orchestrator
#[tokio::test]
async fn test_agents_compete_end_to_end() {
    let mut orchestrator_config = OrchestratorConfig {
        bind_address: "127.0.0.1:0".into(),
        ipc_port: 0,
        ..OrchestratorConfig::default()
    };
    orchestrator_config.scenarios.insert(
        "ai_showdown".into(),
        ScenarioDefinition {
            steps: 2,
            ..orchestrator_config.scenarios["ai_showdown"].clone()
        },
    );

    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::bind(orchestrator_config, cancel.clone())
        .await
        .unwrap();
    let agent_addr = orchestrator.agent_addr().to_string();
    let ipc_addr = orchestrator.ipc_addr().to_string();
    let state = orchestrator.state();
    tokio::spawn(orchestrator.run());

    for (participant, seconds) in [
        (ParticipantId::Snapdragon, 0.2),
        (ParticipantId::Intel, 0.6),
    ] {
        let mut config = agent_config(agent_addr.clone());
        let mut profile = config.device_profile(participant);
        profile.simulation.ai_seconds = Range::new(seconds, seconds);
        config.device = Some(profile);
        tokio::spawn(Agent::new(config, participant).run(cancel.clone()));
    }

    // Wait for both registrations
    timeout(WAIT, async {
        while state.registry.connected_count() < 2 || state.connections.len() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Agents did not register");

    let stream = TcpStream::connect(&ipc_addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let mut request = serde_json::to_string(&IpcRequest::StartDemo {
        scenario: "ai_showdown".into(),
    })
    .unwrap();
    request.push('\n');
    write_half.write_all(request.as_bytes()).await.unwrap();

    let verdict = timeout(WAIT, async {
        let mut started = false;
        while let Some(line) = lines.next_line().await.unwrap() {
            if let Ok(response) = serde_json::from_str::<IpcResponse>(&line) {
                assert!(
                    matches!(response, IpcResponse::DemoStarted { ref dispatched, .. } if dispatched.len() == 2),
                    "unexpected response {:?}",
                    response
                );
                started = true;
                continue;
            }
            if let Ok(IpcEvent::WinnerDeclared(verdict)) = serde_json::from_str(&line) {
                return Some((started, verdict));
            }
        }
        None
    })
    .await
    .expect("No verdict in time")
    .expect("IPC connection closed");

    let (started, verdict) = verdict;
    assert!(started);
    assert_eq!(verdict.winner, Some(ParticipantId::Snapdragon));
    assert!(verdict.standings.iter().all(|s| !s.lost));

    cancel.cancel();
}
