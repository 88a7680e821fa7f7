//! Stdio MCP transport
//!
//! [`StdioSessionManager`] owns one spawned MCP server for the life of the
//! client: spawn, initialize handshake, tool discovery, calls, and teardown.
//! Process creation and the wire protocol sit behind [`ServerLauncher`] so the
//! session lifecycle can be exercised without a real server.

mod process;
mod session;

pub use process::{
    ChildProcessLauncher, LaunchSpec, ServerLauncher, ServerProcess, ToolSession,
};
pub use session::{SessionState, StdioSessionManager};
