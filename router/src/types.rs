//! Request and tool types shared by both transports

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ErrorKind, ToolError};

/// A tool exposed by the stdio server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Tool name (unique per server)
    pub name: String,
    /// Tool description
    pub description: Option<String>,
    /// Input schema (JSON)
    pub input_schema: Value,
}

/// Structured request as produced by the interpreter, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InterpretedRequest {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl InterpretedRequest {
    pub fn new(tool_name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            parameters,
        }
    }
}

/// A validated tool invocation
///
/// Serializes as the HTTP wire body `{tool_name, tool_use_id, parameters}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(rename = "tool_use_id")]
    pub correlation_id: Uuid,
    pub parameters: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(tool_name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            correlation_id: Uuid::new_v4(),
            parameters,
        }
    }
}

impl TryFrom<InterpretedRequest> for ToolRequest {
    type Error = ToolError;

    fn try_from(value: InterpretedRequest) -> Result<Self, Self::Error> {
        match value.tool_name {
            Some(name) if !name.trim().is_empty() => {
                Ok(ToolRequest::new(name.trim(), value.parameters))
            }
            _ => Err(ToolError::new(
                ErrorKind::MissingToolName,
                "Instruction has no tool_name",
            )),
        }
    }
}
