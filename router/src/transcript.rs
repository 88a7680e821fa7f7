//! Append-only transcript of dispatched requests
//!
//! Each dispatch appends one human-readable block:
//!
//! ```text
//! ### REQUEST 2026-01-01T12:00:00.000Z ###
//! { ...request json... }
//! ### RESPONSE ###
//! { ...result json... }
//!
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{result_to_value, ToolResult};
use crate::types::ToolRequest;

/// One dispatched instruction and its outcome
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub instruction: String,
    /// Absent when the request was rejected before validation
    pub request: Option<ToolRequest>,
    pub result: ToolResult,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(instruction: &str, request: Option<ToolRequest>, result: ToolResult) -> Self {
        Self {
            instruction: instruction.to_string(),
            request,
            result,
            timestamp: Utc::now(),
        }
    }

    fn request_value(&self) -> Value {
        match &self.request {
            Some(request) => serde_json::to_value(request)
                .unwrap_or_else(|_| Value::String(request.tool_name.clone())),
            None => serde_json::json!({ "instruction": self.instruction }),
        }
    }

    /// Render the block written to the transcript file
    pub fn render(&self) -> String {
        let request = serde_json::to_string_pretty(&self.request_value()).unwrap_or_default();
        let response =
            serde_json::to_string_pretty(&result_to_value(&self.result)).unwrap_or_default();
        format!(
            "### REQUEST {} ###\n{}\n### RESPONSE ###\n{}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            request,
            response
        )
    }
}

/// Append-only transcript file
#[derive(Debug, Clone)]
pub struct TranscriptLogger {
    path: PathBuf,
}

impl TranscriptLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file on first use
    pub fn append(&self, entry: &TranscriptEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.render().as_bytes())?;
        file.flush()
    }
}
