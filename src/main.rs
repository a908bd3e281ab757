//! Hearth - Entry Point
//!
//! Console front-end for the command resolution engine: reads free-text
//! requests from stdin, runs each one through the orchestrator against the
//! configured hub, and prints the outcome. The same engine sits behind any
//! other reply channel; this binary is the smallest useful transport.

use clap::Parser;
use hearth::audit::TracingAudit;
use hearth::command::Orchestrator;
use hearth::core::config::EngineConfig;
use hearth::core::error::Result;
use hearth::hub::HubClient;
use hearth::llm::{FallbackAdapter, LlmClient};
use hearth::reply::ConsoleReply;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Console user id used for rate limiting and audit entries
const CONSOLE_USER: u64 = 0;

#[derive(Parser)]
#[command(name = "hearth", about = "Conversational home-automation assistant")]
struct Args {
    /// Hub base URL; falls back to the HUB_URL environment variable
    #[arg(long)]
    hub_url: Option<String>,

    /// Hub access token; falls back to HUB_TOKEN
    #[arg(long)]
    hub_token: Option<String>,

    /// Engine configuration TOML; defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process a single command and exit
    #[arg(long)]
    once: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let hub = match (args.hub_url, args.hub_token) {
        (Some(url), Some(token)) => HubClient::new(url, token),
        _ => HubClient::from_env()?,
    };

    if !hub.test_connection().await {
        tracing::warn!("Hub not reachable yet - commands will fail until it is");
    }

    // The model is optional: without it, only rule-based parsing runs
    let llm_client = LlmClient::from_env().ok();
    if llm_client.is_none() {
        tracing::warn!("LLM_API_KEY not set - running without model fallback");
    }
    let model = FallbackAdapter::new(llm_client);

    let audit = TracingAudit;
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);
    let reply = ConsoleReply;

    if let Some(utterance) = args.once {
        orchestrator
            .respond(CONSOLE_USER, &utterance, &reply)
            .await?;
        return Ok(());
    }

    println!("\n=== HEARTH ===");
    println!("Tell me what you want:");
    println!("  \"turn on bedroom lights\"");
    println!("  \"set temperature to 21\"");
    println!("  \"is the front door locked?\"");
    println!("  \"gm\" / \"gn\" / \"leaving\"  - scene shortcuts");
    println!("  quit / q                 - exit");
    println!();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        if let Err(e) = orchestrator.respond(CONSOLE_USER, input, &reply).await {
            tracing::error!("Turn failed: {}", e);
        }
    }

    Ok(())
}
