//! LLM-backed request interpretation
//!
//! Turns a free-text instruction into an [`InterpretedRequest`](crate::types::InterpretedRequest).

mod interpret;
mod ollama;

pub use interpret::{strip_code_fence, Interpreter, SYSTEM_PROMPT};
pub use ollama::OllamaClient;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for LLM backends
#[async_trait]
pub trait Llm: Send + Sync {
    /// Send one user message under a system prompt and get the reply
    async fn chat(&self, system: &str, message: &str) -> Result<String>;

    /// Get the model name
    fn model(&self) -> &str;
}
