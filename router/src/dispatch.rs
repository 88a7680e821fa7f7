//! Request dispatch across the two transports
//!
//! The [`Dispatcher`] validates an interpreted request, confines its `path`
//! to the sandbox, picks a transport from the instruction text, and records
//! every outcome in the transcript. The stdio session is preferred for
//! filesystem instructions only while it is `Ready`; everything else goes
//! over HTTP.

use std::path::Path;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::error::{ConfigError, ErrorKind, ToolError, ToolResult};
use crate::mcp::{ChildProcessLauncher, ServerLauncher, StdioSessionManager};
use crate::remote::HttpTransportClient;
use crate::routing::{IntentRouter, PathNormalizer, Route, SandboxRoot};
use crate::transcript::{TranscriptEntry, TranscriptLogger};
use crate::types::{InterpretedRequest, ToolRequest};

/// Stdio tools whose target directory is created before the call
const WRITE_TOOLS: &[&str] = &["write_file"];

pub struct Dispatcher {
    sandbox: SandboxRoot,
    normalizer: PathNormalizer,
    router: IntentRouter,
    session: StdioSessionManager,
    http: HttpTransportClient,
    transcript: TranscriptLogger,
}

impl Dispatcher {
    /// Build all components from config; the session starts `Uninitialized`
    pub fn new(config: &RouterConfig, launcher: Arc<dyn ServerLauncher>) -> Result<Self, ConfigError> {
        let sandbox = SandboxRoot::prepare(&config.sandbox.root)?;
        let normalizer = PathNormalizer::for_root(&sandbox);
        let router = IntentRouter::with_keywords(&config.routing.extra_keywords)?;
        let session = StdioSessionManager::new(config.stdio.clone(), sandbox.absolute(), launcher);
        let http = HttpTransportClient::from_config(&config.http)?;
        let transcript = TranscriptLogger::new(config.transcript.path.clone());

        Ok(Self {
            sandbox,
            normalizer,
            router,
            session,
            http,
            transcript,
        })
    }

    /// Dispatcher whose stdio session spawns a real child process
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(ChildProcessLauncher))
    }

    pub fn sandbox(&self) -> &SandboxRoot {
        &self.sandbox
    }

    pub fn session(&self) -> &StdioSessionManager {
        &self.session
    }

    pub fn transcript(&self) -> &TranscriptLogger {
        &self.transcript
    }

    /// Start the stdio session and discover its tools
    ///
    /// Failure is not fatal: requests keep flowing over HTTP. A session whose
    /// tools cannot be listed is stopped. Returns whether the session is ready.
    pub async fn start_session(&mut self) -> bool {
        if let Err(e) = self.session.start().await {
            tracing::warn!("Stdio server unavailable, using HTTP only: {}", e);
            return false;
        }
        if let Err(e) = self.session.discover_tools().await {
            tracing::warn!("Tool discovery failed, using HTTP only: {}", e);
            self.session.stop().await;
            return false;
        }
        self.session.is_ready()
    }

    /// Dispatch one instruction and record the outcome
    pub async fn dispatch(
        &mut self,
        instruction: &str,
        interpreted: Option<InterpretedRequest>,
    ) -> ToolResult {
        let (request, result) = match self.prepare(interpreted) {
            Ok(request) => {
                let result = self.route(instruction, &request).await;
                (Some(request), result)
            }
            Err(e) => (None, Err(e)),
        };

        let entry = TranscriptEntry::new(instruction, request, result.clone());
        if let Err(e) = self.transcript.append(&entry) {
            tracing::warn!(
                "Failed to write transcript {}: {}",
                self.transcript.path().display(),
                e
            );
        }

        result
    }

    /// Tear down the stdio session; safe to call more than once
    pub async fn shutdown(&mut self) {
        self.session.stop().await;
    }

    fn prepare(&self, interpreted: Option<InterpretedRequest>) -> Result<ToolRequest, ToolError> {
        let interpreted = interpreted.ok_or_else(|| {
            ToolError::new(
                ErrorKind::InterpretationFailed,
                "Instruction could not be interpreted",
            )
        })?;

        let mut request = ToolRequest::try_from(interpreted)?;
        self.normalizer.normalize_parameters(&mut request.parameters);
        Ok(request)
    }

    async fn route(&mut self, instruction: &str, request: &ToolRequest) -> ToolResult {
        match self.router.classify(instruction) {
            Route::SubprocessFs if self.session.is_ready() => {
                tracing::info!("Routing '{}' to stdio server", request.tool_name);
                self.prepare_write_target(request);
                self.session
                    .call(&request.tool_name, request.parameters.clone())
                    .await
            }
            Route::SubprocessFs => {
                tracing::info!(
                    "Stdio session is {}, routing '{}' over HTTP",
                    self.session.state(),
                    request.tool_name
                );
                self.http.call(request).await
            }
            Route::LocalHttp => {
                tracing::info!("Routing '{}' over HTTP", request.tool_name);
                self.http.call(request).await
            }
        }
    }

    fn prepare_write_target(&self, request: &ToolRequest) {
        if !WRITE_TOOLS.contains(&request.tool_name.as_str()) {
            return;
        }
        let Some(path) = request.parameters.get("path").and_then(|p| p.as_str()) else {
            return;
        };
        if let Some(parent) = Path::new(path).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create {}: {}", parent.display(), e);
            }
        }
    }
}
