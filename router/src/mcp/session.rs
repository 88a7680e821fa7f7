//! Stdio session lifecycle

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::process::{ChildProcessLauncher, LaunchSpec, ServerLauncher, ServerProcess, ToolSession};
use crate::config::StdioServerConfig;
use crate::error::{ErrorKind, ToolError, ToolResult};
use crate::types::ToolDescriptor;

/// Lifecycle of the stdio session
///
/// `Uninitialized -> Starting -> Ready -> Stopped`, with `Failed` reachable
/// from `Starting`. `stop()` reaches `Stopped` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Ready,
    Failed,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Owns one subprocess-backed MCP session end to end
///
/// The process and session handles never leave this struct. Callers must
/// `stop()` it on every exit path; the production launcher also kills the
/// child on drop.
pub struct StdioSessionManager {
    config: StdioServerConfig,
    sandbox: PathBuf,
    launcher: Arc<dyn ServerLauncher>,
    state: SessionState,
    process: Option<Box<dyn ServerProcess>>,
    session: Option<Box<dyn ToolSession>>,
    tools: HashMap<String, ToolDescriptor>,
}

impl StdioSessionManager {
    pub fn new(
        config: StdioServerConfig,
        sandbox: &Path,
        launcher: Arc<dyn ServerLauncher>,
    ) -> Self {
        Self {
            config,
            sandbox: sandbox.to_path_buf(),
            launcher,
            state: SessionState::Uninitialized,
            process: None,
            session: None,
            tools: HashMap::new(),
        }
    }

    /// Manager that spawns a real child process
    pub fn with_child_process(config: StdioServerConfig, sandbox: &Path) -> Self {
        Self::new(config, sandbox, Arc::new(ChildProcessLauncher))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Discovered tools, sorted by name
    pub fn tools(&self) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Locate, spawn and handshake
    ///
    /// On any failure the state becomes `Failed` and no process is left
    /// running.
    pub async fn start(&mut self) -> Result<(), ToolError> {
        if self.state != SessionState::Uninitialized {
            return Err(ToolError::invalid_state(format!(
                "Cannot start session while it is {}",
                self.state
            )));
        }
        self.state = SessionState::Starting;

        let Some(program) = self.launcher.locate(&self.config.command) else {
            self.state = SessionState::Failed;
            return Err(ToolError::transport_unavailable(format!(
                "'{}' is not available on PATH",
                self.config.command
            )));
        };

        let spec = LaunchSpec {
            program,
            args: self.config.resolved_args(&self.sandbox),
            env: self.config.expanded_env(),
        };

        let mut process = match self.launcher.spawn(&spec).await {
            Ok(process) => process,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        tracing::debug!("MCP server spawned (pid {:?})", process.id());

        let startup_timeout = self.config.startup_timeout();
        let handshake = match tokio::time::timeout(startup_timeout, process.handshake()).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::handshake(format!(
                "No initialize response within {:?}",
                startup_timeout
            ))),
        };

        match handshake {
            Ok(session) => {
                self.process = Some(process);
                self.session = Some(session);
                self.state = SessionState::Ready;
                tracing::info!("Stdio session ready ({})", self.config.command);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Handshake with '{}' failed: {}", self.config.command, e);
                process.terminate().await;
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Fetch the tool list and store it by name (last write wins)
    ///
    /// Returns the number of descriptors the server reported.
    pub async fn discover_tools(&mut self) -> Result<usize, ToolError> {
        let tool_timeout = self.config.tool_timeout();
        let session = self.ready_session("discover tools")?;

        let tools = match tokio::time::timeout(tool_timeout, session.list_tools()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ToolError::new(
                    ErrorKind::Timeout,
                    format!("No tool list within {:?}", tool_timeout),
                ))
            }
        };

        let count = tools.len();
        for tool in tools {
            self.tools.insert(tool.name.clone(), tool);
        }

        tracing::info!("Stdio server: {} tools", count);
        Ok(count)
    }

    /// Invoke a discovered tool
    ///
    /// Unknown tools are rejected without sending anything. Failures never
    /// change the session state.
    pub async fn call(&mut self, tool_name: &str, parameters: Map<String, Value>) -> ToolResult {
        if self.state != SessionState::Ready {
            return Err(ToolError::invalid_state(format!(
                "Cannot call '{}' while session is {}",
                tool_name, self.state
            )));
        }
        if !self.has_tool(tool_name) {
            return Err(ToolError::unknown_tool(tool_name));
        }

        let tool_timeout = self.config.tool_timeout();
        let session = self.ready_session("call a tool")?;

        tracing::debug!("Calling stdio tool '{}'", tool_name);
        match tokio::time::timeout(tool_timeout, session.call_tool(tool_name, parameters)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::new(
                ErrorKind::Timeout,
                format!("Tool '{}' timed out after {:?}", tool_name, tool_timeout),
            )),
        }
    }

    /// Close the session, then terminate the process
    ///
    /// Safe to call in any state and any number of times.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        if let Some(mut process) = self.process.take() {
            process.terminate().await;
        }
        if self.state != SessionState::Stopped {
            tracing::info!("Stdio session stopped (was {})", self.state);
        }
        self.state = SessionState::Stopped;
    }

    fn ready_session(&mut self, operation: &str) -> Result<&mut Box<dyn ToolSession>, ToolError> {
        match (self.state, self.session.as_mut()) {
            (SessionState::Ready, Some(session)) => Ok(session),
            (state, _) => Err(ToolError::invalid_state(format!(
                "Cannot {} while session is {}",
                operation, state
            ))),
        }
    }
}

impl Drop for StdioSessionManager {
    fn drop(&mut self) {
        if self.process.is_some() {
            tracing::warn!("Stdio session dropped without stop()");
        }
    }
}
