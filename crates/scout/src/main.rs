//! The `scout` command: chat with a model that can search the web.

#[macro_use]
extern crate tracing;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use scout::config::AppConfig;
use scout::core::DEFAULT_MAX_TOOL_ROUNDS;
use scout::core::checkpoint::{FileCheckpointStore, MemoryCheckpointStore};
use scout::{RenderStyle, Renderer, Repl, SessionBuilder};
use scout_anthropic_model::AnthropicProvider;
use tokio::io::{self, BufReader};

/// Chat with Claude in the terminal, with web search at hand.
#[derive(Parser)]
#[command(name = "scout", version)]
struct Cli {
    /// Session id to name or resume, a random one is used if omitted
    #[arg(long)]
    session: Option<String>,

    /// Directory to save conversations into, kept in memory if omitted
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// How messages are printed
    #[arg(long, value_enum, default_value_t = RenderStyle::Plain)]
    style: RenderStyle,

    /// Tool round-trips allowed per turn
    #[arg(long, default_value_t = DEFAULT_MAX_TOOL_ROUNDS)]
    max_tool_rounds: usize,

    /// System prompt sent with every request
    #[arg(long)]
    system_prompt: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dotenvy::dotenv_override() {
        Ok(path) => debug!("loaded {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("failed to load .env: {err}"),
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    debug!("config: {config:?}");

    let provider = AnthropicProvider::new(config.anthropic_config());
    let mut builder = SessionBuilder::with_model_provider(provider)
        .with_web_search(config.web_search_tool())
        .with_max_tool_rounds(cli.max_tool_rounds);
    if let Some(prompt) = cli.system_prompt {
        builder = builder.with_system_prompt(prompt);
    }
    if let Some(session_id) = cli.session {
        builder = builder.with_session_id(session_id);
    }
    builder = match cli.checkpoint_dir {
        Some(dir) => {
            let store = FileCheckpointStore::new(dir);
            info!("saving checkpoints to {}", store.dir().display());
            builder.with_checkpoint_store(store)
        }
        None => builder.with_checkpoint_store(MemoryCheckpointStore::new()),
    };

    let mut session = builder.build();
    match session.restore().await {
        Ok(true) => info!(
            "resumed session with {} messages",
            session.conversation().len()
        ),
        Ok(false) => {}
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    println!("Thread id: {}\n", session.session_id());

    let stdout = std::io::stdout();
    let renderer = Renderer::new(cli.style).with_color(stdout.is_terminal());
    let input = BufReader::new(io::stdin());
    let mut repl = Repl::new(session, input, stdout, renderer)
        .with_spinner(std::io::stderr().is_terminal());

    match repl.run().await {
        Ok(exit) => {
            debug!("loop ended: {exit:?}");
            ExitCode::from(exit.exit_code())
        }
        Err(err) => {
            error!("failed to write output: {err}");
            ExitCode::FAILURE
        }
    }
}
