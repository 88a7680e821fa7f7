//! Configuration loading

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Config file searched for by [`RouterConfig::load`]
pub const CONFIG_FILE: &str = ".router.toml";

/// Placeholder in `[stdio].args` replaced by the absolute sandbox root
pub const SANDBOX_PLACEHOLDER: &str = "{sandbox}";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/mcp-router/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("mcp-router").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level configuration (from .router.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub stdio: StdioServerConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub repl: ReplConfig,
}

/// Sandbox directory for subprocess-routed paths
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_root")]
    pub root: PathBuf,
}

/// Remote HTTP transport
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// Stdio MCP server launch settings
#[derive(Debug, Clone, Deserialize)]
pub struct StdioServerConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Bound on spawn + initialize handshake
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
    /// Bound on each tool call
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

/// Transcript file settings
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_transcript_path")]
    pub path: PathBuf,
}

/// Intent routing settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingConfig {
    /// Extra words that send an instruction to the stdio server
    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

/// LLM used to interpret free text
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Interactive loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReplConfig {
    #[serde(default = "default_exit_words")]
    pub exit_words: Vec<String>,
}

// Default value functions
fn default_sandbox_root() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_endpoint() -> String {
    "http://localhost:5000/jsonrpc".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_command() -> String {
    "npx".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "@modelcontextprotocol/server-filesystem".to_string(),
        SANDBOX_PLACEHOLDER.to_string(),
    ]
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_transcript_path() -> PathBuf {
    PathBuf::from("mcp_log.txt")
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_exit_words() -> Vec<String> {
    vec!["salir".to_string(), "exit".to_string(), "quit".to_string()]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_sandbox_root(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for StdioServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            env: HashMap::new(),
            startup_timeout_secs: default_startup_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: default_transcript_path(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
        }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            exit_words: default_exit_words(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StdioServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Arguments with the sandbox placeholder substituted
    pub fn resolved_args(&self, sandbox: &Path) -> Vec<String> {
        let sandbox = sandbox.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(SANDBOX_PLACEHOLDER, &sandbox))
            .collect()
    }

    /// Environment with `$VAR` / `~` references expanded
    pub fn expanded_env(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(key, value)| {
                let expanded = shellexpand::full(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.clone());
                (key.clone(), expanded)
            })
            .collect()
    }
}

impl RouterConfig {
    /// Load config from .router.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .router.toml
    /// 2. Check ~/.config/mcp-router/.router.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(config_path) = find_config_file(CONFIG_FILE) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
