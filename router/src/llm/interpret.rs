//! Free text -> structured request

use std::sync::Arc;

use anyhow::{Context, Result};

use super::Llm;
use crate::types::InterpretedRequest;

/// Instructions given to the model before every user message
pub const SYSTEM_PROMPT: &str = r#"You select tools exposed by MCP servers.
For every user message, answer with ONLY a JSON object naming the tool to use
and its parameters, for example:

{
  "tool_name": "add_task",
  "parameters": {
    "nombre": "Estudiar redes",
    "duracion": 120,
    "deadline": "2025-09-20T23:59",
    "prioridad": "alta",
    "categoria": "universidad"
  }
}

To list tasks: {"tool_name": "list_tasks", "parameters": {}}
To read a file: {"tool_name": "read_file", "parameters": {"path": "notas.txt"}}
To write a file: {"tool_name": "write_file", "parameters": {"path": "nuevo.txt", "content": "Hola mundo"}}
"#;

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```)
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Asks an LLM which tool an instruction wants
pub struct Interpreter {
    llm: Arc<dyn Llm>,
}

impl Interpreter {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    /// Interpret an instruction; `None` when the model or its reply fails
    pub async fn interpret(&self, instruction: &str) -> Option<InterpretedRequest> {
        match self.try_interpret(instruction).await {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!("Could not interpret instruction: {:#}", e);
                None
            }
        }
    }

    async fn try_interpret(&self, instruction: &str) -> Result<InterpretedRequest> {
        let raw = self
            .llm
            .chat(SYSTEM_PROMPT, instruction)
            .await
            .with_context(|| format!("LLM '{}' request failed", self.llm.model()))?;
        tracing::debug!("LLM reply: {}", raw);

        serde_json::from_str(strip_code_fence(&raw)).context("LLM reply is not a tool request")
    }
}
