//! Ollama LLM implementation

use anyhow::Result;
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};

use super::Llm;

/// Ollama client wrapper
pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// Falls back to localhost:11434 when `url` does not parse.
    pub fn new(url: &str, model: &str) -> Self {
        let (host, port) = match url::Url::parse(url) {
            Ok(url) => (
                url.host_str().unwrap_or("localhost").to_string(),
                url.port().unwrap_or(11434),
            ),
            Err(e) => {
                tracing::warn!("Invalid Ollama URL '{}' ({}), using localhost", url, e);
                ("localhost".to_string(), 11434)
            }
        };

        Self {
            client: Ollama::new(format!("http://{}", host), port),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Llm for OllamaClient {
    async fn chat(&self, system: &str, message: &str) -> Result<String> {
        let request = ChatMessageRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(system.to_string()),
                ChatMessage::user(message.to_string()),
            ],
        );

        let response = self.client.send_chat_messages(request).await?;

        Ok(response.message.content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
