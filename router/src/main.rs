use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_router::config::RouterConfig;
use mcp_router::llm::{Interpreter, OllamaClient};
use mcp_router::repl::{render_result, Repl};
use mcp_router::{Dispatcher, InterpretedRequest};

#[derive(Parser)]
#[command(name = "mcp-router")]
#[command(about = "Route tool calls to a stdio MCP server or a remote HTTP endpoint")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: .router.toml, searched upwards from cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sandbox directory for filesystem tools
    #[arg(long, global = true)]
    sandbox_root: Option<PathBuf>,

    /// Remote tool endpoint
    #[arg(long, global = true, env = "MCP_ROUTER_ENDPOINT")]
    endpoint: Option<String>,

    /// Ollama server URL
    #[arg(long, global = true, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model used to interpret instructions
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Chat,
    /// List tools exposed by the stdio server
    Tools,
    /// Dispatch one tool call without the LLM
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, short)]
        args: Option<String>,
        /// Instruction text used for routing (default: the tool name)
        #[arg(long, short)]
        instruction: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries results
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut dispatcher = Dispatcher::from_config(&config).context("Invalid configuration")?;

    let outcome = run(cli.command.unwrap_or(Commands::Chat), &config, &mut dispatcher).await;
    dispatcher.shutdown().await;
    outcome
}

fn load_config(cli: &Cli) -> Result<RouterConfig> {
    let mut config = match &cli.config {
        Some(path) => RouterConfig::load_from_path(path)?,
        None => RouterConfig::load()?,
    };

    if let Some(root) = &cli.sandbox_root {
        config.sandbox.root = root.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.http.endpoint = endpoint.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.llm.url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }

    Ok(config)
}

async fn run(command: Commands, config: &RouterConfig, dispatcher: &mut Dispatcher) -> Result<()> {
    match command {
        Commands::Chat => run_chat(config, dispatcher).await,
        Commands::Tools => run_tools(dispatcher).await,
        Commands::Call {
            tool,
            args,
            instruction,
        } => run_call(dispatcher, tool, args, instruction).await,
    }
}

async fn run_chat(config: &RouterConfig, dispatcher: &mut Dispatcher) -> Result<()> {
    println!("MCP router (stdio filesystem + HTTP tools)");
    println!("Type '{}' to exit.", config.repl.exit_words.join("' or '"));

    if dispatcher.start_session().await {
        println!(
            "Filesystem server ready ({} tools, sandbox {}).",
            dispatcher.session().tools().len(),
            dispatcher.sandbox().absolute().display()
        );
    } else {
        println!("Filesystem server unavailable; all requests go over HTTP.");
    }
    println!();

    let llm = OllamaClient::new(&config.llm.url, &config.llm.model);
    let interpreter = Interpreter::new(Arc::new(llm));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    Repl::new(dispatcher, &interpreter, config.repl.exit_words.clone())
        .run(stdin)
        .await
}

async fn run_tools(dispatcher: &mut Dispatcher) -> Result<()> {
    if !dispatcher.start_session().await {
        bail!(
            "Stdio server is not available (state: {})",
            dispatcher.session().state()
        );
    }

    let tools = dispatcher.session().tools();
    println!("{} tools:", tools.len());
    for tool in tools {
        match &tool.description {
            Some(desc) => println!("  {} - {}", tool.name, desc),
            None => println!("  {}", tool.name),
        }
    }
    Ok(())
}

async fn run_call(
    dispatcher: &mut Dispatcher,
    tool: String,
    args: Option<String>,
    instruction: Option<String>,
) -> Result<()> {
    let parameters = match args {
        Some(raw) => match serde_json::from_str(&raw).context("Invalid --args JSON")? {
            serde_json::Value::Object(map) => map,
            other => bail!("--args must be a JSON object, got {}", other),
        },
        None => serde_json::Map::new(),
    };

    // "read_file" -> "read file", so tool names route like instructions
    let instruction = instruction.unwrap_or_else(|| tool.replace('_', " "));

    dispatcher.start_session().await;
    let result = dispatcher
        .dispatch(&instruction, Some(InterpretedRequest::new(tool, parameters)))
        .await;
    println!("{}", render_result(&result));
    Ok(())
}
