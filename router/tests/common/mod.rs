//! Shared test fixtures: an in-memory stdio server and config helpers
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use mcp_router::config::RouterConfig;
use mcp_router::mcp::{LaunchSpec, ServerLauncher, ServerProcess, ToolSession};
use mcp_router::{ToolDescriptor, ToolError};

/// Counters and an event log shared by a fake launcher and everything it spawns
#[derive(Default)]
pub struct Recorder {
    pub spawned: AtomicUsize,
    pub terminated: AtomicUsize,
    pub closed: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub tool_calls: AtomicUsize,
    events: Mutex<Vec<&'static str>>,
    last_spec: Mutex<Option<LaunchSpec>>,
}

impl Recorder {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_spec(&self) -> Option<LaunchSpec> {
        self.last_spec.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Clone, Copy, PartialEq)]
pub enum Handshake {
    Ok,
    Fails,
    Hangs,
}

#[derive(Clone)]
pub struct FakeLauncher {
    pub installed: bool,
    pub handshake: Handshake,
    pub tools: Vec<ToolDescriptor>,
    pub fail_calls: bool,
    pub fail_list: bool,
    pub recorder: Arc<Recorder>,
}

pub fn tool(name: &str, description: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: json!({"type": "object"}),
    }
}

impl FakeLauncher {
    /// Server that handshakes and exposes `tools`
    pub fn ready(tools: &[&str]) -> Self {
        Self {
            installed: true,
            handshake: Handshake::Ok,
            tools: tools.iter().map(|name| tool(name, "fake tool")).collect(),
            fail_calls: false,
            fail_list: false,
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Executable not found on PATH
    pub fn missing() -> Self {
        Self {
            installed: false,
            ..Self::ready(&[])
        }
    }

    pub fn with_handshake(handshake: Handshake) -> Self {
        Self {
            handshake,
            ..Self::ready(&["read_file"])
        }
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        self.recorder.clone()
    }
}

#[async_trait]
impl ServerLauncher for FakeLauncher {
    fn locate(&self, command: &str) -> Option<PathBuf> {
        self.installed
            .then(|| PathBuf::from("/usr/local/bin").join(command))
    }

    async fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ServerProcess>, ToolError> {
        self.recorder.spawned.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("spawn");
        *self.recorder.last_spec.lock().unwrap() = Some(spec.clone());
        Ok(Box::new(FakeProcess {
            launcher: self.clone(),
        }))
    }
}

struct FakeProcess {
    launcher: FakeLauncher,
}

#[async_trait]
impl ServerProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    async fn handshake(&mut self) -> Result<Box<dyn ToolSession>, ToolError> {
        match self.launcher.handshake {
            Handshake::Ok => Ok(Box::new(FakeSession {
                launcher: self.launcher.clone(),
            })),
            Handshake::Fails => Err(ToolError::handshake("garbage on stdout")),
            Handshake::Hangs => std::future::pending().await,
        }
    }

    async fn terminate(&mut self) {
        self.launcher
            .recorder
            .terminated
            .fetch_add(1, Ordering::SeqCst);
        self.launcher.recorder.record("terminate");
    }
}

struct FakeSession {
    launcher: FakeLauncher,
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ToolError> {
        self.launcher
            .recorder
            .list_calls
            .fetch_add(1, Ordering::SeqCst);
        if self.launcher.fail_list {
            return Err(ToolError::malformed("tools/list returned garbage"));
        }
        Ok(self.launcher.tools.clone())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        self.launcher
            .recorder
            .tool_calls
            .fetch_add(1, Ordering::SeqCst);
        if self.launcher.fail_calls {
            return Err(ToolError::malformed("broken pipe"));
        }
        Ok(json!({
            "content": [{"type": "text", "text": format!("{} ok", name)}],
            "arguments": arguments,
        }))
    }

    async fn close(self: Box<Self>) {
        self.launcher.recorder.closed.fetch_add(1, Ordering::SeqCst);
        self.launcher.recorder.record("close");
    }
}

/// Config rooted in `dir`, pointing HTTP at `endpoint`
pub fn test_config(dir: &Path, endpoint: &str) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.sandbox.root = dir.join("workspace");
    config.transcript.path = dir.join("mcp_log.txt");
    config.http.endpoint = endpoint.to_string();
    config.http.timeout_secs = 5;
    config.stdio.command = "fake-mcp".to_string();
    config.stdio.startup_timeout_secs = 1;
    config.stdio.tool_timeout_secs = 5;
    config
}

/// Number of entries in a transcript file
pub fn transcript_entries(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.matches("### REQUEST").count())
        .unwrap_or(0)
}
