//! Stdio session lifecycle against an in-memory server

mod common;

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map};

use common::{tool, FakeLauncher, Handshake, Recorder};
use mcp_router::config::StdioServerConfig;
use mcp_router::mcp::{SessionState, StdioSessionManager};
use mcp_router::ErrorKind;

fn server_config() -> StdioServerConfig {
    StdioServerConfig {
        command: "fake-mcp".to_string(),
        args: vec!["--root".to_string(), "{sandbox}".to_string()],
        startup_timeout_secs: 1,
        ..Default::default()
    }
}

fn manager(launcher: &FakeLauncher) -> StdioSessionManager {
    StdioSessionManager::new(
        server_config(),
        Path::new("/srv/workspace"),
        Arc::new(launcher.clone()),
    )
}

async fn ready_manager(launcher: &FakeLauncher) -> StdioSessionManager {
    let mut session = manager(launcher);
    session.start().await.unwrap();
    session.discover_tools().await.unwrap();
    session
}

#[tokio::test]
async fn test_start_and_discover() {
    let launcher = FakeLauncher::ready(&["read_file", "write_file"]);
    let mut session = manager(&launcher);
    assert_eq!(session.state(), SessionState::Uninitialized);

    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    assert_eq!(session.discover_tools().await.unwrap(), 2);
    let names: Vec<_> = session.tools().iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["read_file", "write_file"]);

    session.stop().await;
}

#[tokio::test]
async fn test_sandbox_placeholder_is_resolved() {
    let launcher = FakeLauncher::ready(&[]);
    let mut session = manager(&launcher);
    session.start().await.unwrap();

    let spec = launcher.recorder().last_spec().unwrap();
    assert_eq!(spec.program, Path::new("/usr/local/bin/fake-mcp"));
    assert_eq!(spec.args, vec!["--root", "/srv/workspace"]);

    session.stop().await;
}

#[tokio::test]
async fn test_unknown_tool_never_reaches_server() {
    let launcher = FakeLauncher::ready(&["read_file"]);
    let recorder = launcher.recorder();
    let mut session = ready_manager(&launcher).await;

    let err = session
        .call("delete_everything", Map::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnknownTool);
    assert_eq!(Recorder::count(&recorder.tool_calls), 0);
    session.stop().await;
}

#[tokio::test]
async fn test_call_known_tool() {
    let launcher = FakeLauncher::ready(&["read_file"]);
    let recorder = launcher.recorder();
    let mut session = ready_manager(&launcher).await;

    let mut params = Map::new();
    params.insert("path".to_string(), json!("workspace/notas.txt"));
    let output = session.call("read_file", params).await.unwrap();

    assert_eq!(output["arguments"]["path"], "workspace/notas.txt");
    assert_eq!(Recorder::count(&recorder.tool_calls), 1);
    session.stop().await;
}

#[tokio::test]
async fn test_failed_call_keeps_session_ready() {
    let launcher = FakeLauncher {
        fail_calls: true,
        ..FakeLauncher::ready(&["read_file"])
    };
    let mut session = ready_manager(&launcher).await;

    let err = session.call("read_file", Map::new()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::MalformedResponse);
    assert_eq!(session.state(), SessionState::Ready);
    session.stop().await;
}

#[tokio::test]
async fn test_discover_before_start_is_invalid() {
    let launcher = FakeLauncher::ready(&["read_file"]);
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    let err = session.discover_tools().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert!(session.tools().is_empty());
    assert_eq!(Recorder::count(&recorder.list_calls), 0);
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_call_before_start_is_invalid() {
    let launcher = FakeLauncher::ready(&["read_file"]);
    let mut session = manager(&launcher);

    let err = session.call("read_file", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_discovery_is_last_write_wins() {
    let launcher = FakeLauncher {
        tools: vec![tool("read_file", "old"), tool("read_file", "new")],
        ..FakeLauncher::ready(&[])
    };
    let mut session = manager(&launcher);
    session.start().await.unwrap();

    assert_eq!(session.discover_tools().await.unwrap(), 2);
    assert_eq!(session.discover_tools().await.unwrap(), 2);

    let tools = session.tools();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].description.as_deref(), Some("new"));
    session.stop().await;
}

#[tokio::test]
async fn test_missing_executable_spawns_nothing() {
    let launcher = FakeLauncher::missing();
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::TransportUnavailable);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(Recorder::count(&recorder.spawned), 0);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_handshake_failure_terminates_process() {
    let launcher = FakeLauncher::with_handshake(Handshake::Fails);
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HandshakeFailure);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(recorder.events(), vec!["spawn", "terminate"]);

    // Nothing left to release
    session.stop().await;
    assert_eq!(Recorder::count(&recorder.terminated), 1);
}

#[tokio::test]
async fn test_handshake_timeout_terminates_process() {
    let launcher = FakeLauncher::with_handshake(Handshake::Hangs);
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HandshakeFailure);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(Recorder::count(&recorder.terminated), 1);
}

#[tokio::test]
async fn test_start_twice_is_invalid() {
    let launcher = FakeLauncher::ready(&[]);
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    session.start().await.unwrap();
    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(Recorder::count(&recorder.spawned), 1);
    session.stop().await;
}

#[tokio::test]
async fn test_stop_before_start_is_harmless() {
    let launcher = FakeLauncher::ready(&[]);
    let recorder = launcher.recorder();
    let mut session = manager(&launcher);

    session.stop().await;
    session.stop().await;

    assert_eq!(session.state(), SessionState::Stopped);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_stop_closes_session_then_terminates_once() {
    let launcher = FakeLauncher::ready(&["read_file"]);
    let recorder = launcher.recorder();
    let mut session = ready_manager(&launcher).await;

    session.stop().await;
    session.stop().await;

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(recorder.events(), vec!["spawn", "close", "terminate"]);

    let err = session.call("read_file", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[cfg(unix)]
fn process_exists(pid: &str) -> bool {
    std::process::Command::new("sh")
        .args(["-c", &format!("kill -0 {} 2>/dev/null", pid)])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(unix)]
#[tokio::test]
async fn test_child_process_garbage_handshake_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("server.pid");
    let config = StdioServerConfig {
        command: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("echo $$ > '{}'; echo garbage; exec sleep 30", pid_file.display()),
        ],
        startup_timeout_secs: 5,
        ..Default::default()
    };
    let mut session = StdioSessionManager::with_child_process(config, dir.path());

    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HandshakeFailure);
    assert_eq!(session.state(), SessionState::Failed);
    let pid = std::fs::read_to_string(&pid_file).unwrap();
    assert!(!process_exists(pid.trim()));
    session.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_child_process_exiting_before_handshake_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = StdioServerConfig {
        command: "true".to_string(),
        args: vec![],
        startup_timeout_secs: 5,
        ..Default::default()
    };
    let mut session = StdioSessionManager::with_child_process(config, dir.path());

    let err = session.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HandshakeFailure);
    assert_eq!(session.state(), SessionState::Failed);
}
