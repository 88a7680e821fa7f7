//! Interactive loop: read an instruction, interpret it, dispatch it

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::dispatch::Dispatcher;
use crate::error::{result_to_value, ToolResult};
use crate::llm::Interpreter;

/// True when `input` is one of the exit words (case-insensitive)
pub fn is_exit(input: &str, exit_words: &[String]) -> bool {
    let input = input.trim();
    exit_words.iter().any(|w| w.eq_ignore_ascii_case(input))
}

/// Pretty JSON for a dispatch result
pub fn render_result(result: &ToolResult) -> String {
    serde_json::to_string_pretty(&result_to_value(result)).unwrap_or_default()
}

pub struct Repl<'a> {
    dispatcher: &'a mut Dispatcher,
    interpreter: &'a Interpreter,
    exit_words: Vec<String>,
}

impl<'a> Repl<'a> {
    pub fn new(
        dispatcher: &'a mut Dispatcher,
        interpreter: &'a Interpreter,
        exit_words: Vec<String>,
    ) -> Self {
        Self {
            dispatcher,
            interpreter,
            exit_words,
        }
    }

    /// Run until an exit word or end of input
    ///
    /// A failed dispatch is printed and the loop continues.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        let mut stdout = std::io::stdout();

        loop {
            print!("> ");
            stdout.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if is_exit(line, &self.exit_words) {
                break;
            }

            let interpreted = self.interpreter.interpret(line).await;
            if let Some(request) = &interpreted {
                println!(
                    "Calling '{}' with {}",
                    request.tool_name.as_deref().unwrap_or("?"),
                    serde_json::Value::Object(request.parameters.clone())
                );
            }

            let result = self.dispatcher.dispatch(line, interpreted).await;
            println!("{}\n", render_result(&result));
        }

        Ok(())
    }
}
