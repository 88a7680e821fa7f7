//! Dual-transport MCP tool router
//!
//! Routes tool calls either to a spawned stdio MCP server or to a remote HTTP
//! endpoint, and records every call in an append-only transcript.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod remote;
pub mod repl;
pub mod routing;
pub mod transcript;
pub mod types;

pub use dispatch::Dispatcher;
pub use error::{ErrorKind, ToolError, ToolResult};
pub use types::{InterpretedRequest, ToolDescriptor, ToolRequest};
