//! Server process launching and the rmcp-backed session

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use rmcp::{
    model::CallToolRequestParam, service::RunningService, RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use tokio::process::{Child, Command};

use crate::error::ToolError;
use crate::types::ToolDescriptor;

/// Fully resolved command line for the server process
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Live request/response channel established by the handshake
#[async_trait]
pub trait ToolSession: Send {
    /// Query the server's tool list
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Invoke one tool and wait for its single reply
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError>;

    /// Release the session; the process may still be running afterwards
    async fn close(self: Box<Self>);
}

/// A spawned server process
#[async_trait]
pub trait ServerProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Run the initialize exchange over the process's stdio
    async fn handshake(&mut self) -> Result<Box<dyn ToolSession>, ToolError>;

    /// Kill the process (if still running) and reap it
    async fn terminate(&mut self);
}

/// Locates and spawns server executables
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    /// Resolve `command` to an executable, without spawning anything
    fn locate(&self, command: &str) -> Option<PathBuf>;

    async fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ServerProcess>, ToolError>;
}

// =============================================================================
// Child process launcher (production)
// =============================================================================

/// Spawns the server with `tokio::process` and speaks MCP through rmcp
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildProcessLauncher;

#[async_trait]
impl ServerLauncher for ChildProcessLauncher {
    fn locate(&self, command: &str) -> Option<PathBuf> {
        which::which(command).ok()
    }

    async fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ServerProcess>, ToolError> {
        tracing::debug!("Spawning MCP server: {} {:?}", spec.program.display(), spec.args);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            ToolError::transport_unavailable(format!(
                "Failed to spawn {}: {}",
                spec.program.display(),
                e
            ))
        })?;

        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

#[async_trait]
impl ServerProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn handshake(&mut self) -> Result<Box<dyn ToolSession>, ToolError> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| ToolError::handshake("Server stdout is not piped"))?;
        let stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| ToolError::handshake("Server stdin is not piped"))?;

        let service = ()
            .serve((stdout, stdin))
            .await
            .map_err(|e| ToolError::handshake(format!("Initialize failed: {}", e)))?;

        tracing::debug!("MCP server info: {:?}", service.peer_info());

        Ok(Box::new(RmcpSession { service }))
    }

    async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("MCP server already exited: {}", status);
            }
            _ => {
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("Failed to kill MCP server: {}", e);
                }
            }
        }
    }
}

struct RmcpSession {
    service: RunningService<RoleClient, ()>,
}

#[async_trait]
impl ToolSession for RmcpSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let response = self
            .service
            .list_tools(Default::default())
            .await
            .map_err(|e| ToolError::malformed(format!("Failed to list tools: {}", e)))?;

        Ok(response
            .tools
            .into_iter()
            .map(|t| ToolDescriptor {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: serde_json::to_value(&t.input_schema).unwrap_or_default(),
            })
            .collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| ToolError::malformed(format!("Failed to call tool '{}': {}", name, e)))?;

        serde_json::to_value(&result)
            .map_err(|e| ToolError::malformed(format!("Unserializable tool result: {}", e)))
    }

    async fn close(self: Box<Self>) {
        match self.service.cancel().await {
            Ok(reason) => tracing::debug!("MCP session closed: {:?}", reason),
            Err(e) => tracing::warn!("MCP session did not shut down cleanly: {}", e),
        }
    }
}
