//! relay - command-line front end for llm-relay
//!
//! Loads the provider configuration, then either sends one chat request through the
//! fallback dispatcher or lists the registered providers.

#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use llm_relay::config::load_config;
use llm_relay::utils::init_logging;
use llm_relay::{CancelHandle, CompletionService, DispatchOptions, NormalizedRequest};

#[derive(Parser)]
#[command(name = "relay", version, about = "Send chat completions through a fallback chain of LLM providers")]
struct Cli {
    /// Configuration file (defaults to config/relay.yaml)
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one chat request
    Chat(ChatArgs),
    /// List registered providers and their capabilities
    Providers {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ChatArgs {
    /// User message
    prompt: String,

    /// System instruction
    #[arg(short, long)]
    system: Option<String>,

    /// Model name; empty uses each provider's default model
    #[arg(short, long, default_value = "")]
    model: String,

    /// Provider to try first
    #[arg(short, long)]
    provider: Option<String>,

    /// Provider order, comma separated
    #[arg(long, value_delimiter = ',')]
    order: Vec<String>,

    /// Stream the answer as it is generated
    #[arg(long)]
    stream: bool,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Retries per provider
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Budget of the whole call in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,
}

impl ChatArgs {
    fn request(&self) -> NormalizedRequest {
        let mut request = NormalizedRequest::new(self.model.clone());
        if let Some(system) = &self.system {
            request = request.system(system.clone());
        }
        request = request.user(self.prompt.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    fn options(&self, cancel: CancelHandle) -> DispatchOptions {
        let mut options = DispatchOptions::new().cancel(cancel);
        if let Some(provider) = &self.provider {
            options = options.provider(provider.as_str());
        }
        if !self.order.is_empty() {
            options = options.order(self.order.iter().map(String::as_str));
        }
        if let Some(retry_limit) = self.retry_limit {
            options = options.retry_limit(retry_limit);
        }
        if let Some(deadline_ms) = self.deadline_ms {
            options = options.deadline_ms(deadline_ms);
        }
        options
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())
        .await
        .context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging).context("failed to initialize logging")?;

    let service = CompletionService::from_config(&config)
        .await
        .context("failed to initialize providers")?;

    match cli.command {
        Command::Providers { json } => list_providers(&service, json),
        Command::Chat(args) => chat(&service, &args).await,
    }
}

fn list_providers(service: &CompletionService, json: bool) -> Result<()> {
    let providers = service.providers();
    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }
    for provider in providers {
        println!("{:<16} {}", provider.key, provider.capabilities);
    }
    Ok(())
}

async fn chat(service: &CompletionService, args: &ChatArgs) -> Result<()> {
    let cancel = CancelHandle::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let request = args.request();
    let options = args.options(cancel);

    if args.stream {
        let mut stream = service.submit_stream(request, options).await?;
        eprintln!("[{}]", stream.provider());

        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            write!(stdout, "{}", chunk?.content())?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let outcome = service.submit_with_outcome(request, options).await?;
        println!("{}", outcome.value.text().unwrap_or_default());
        eprintln!(
            "[{} model={} attempts={} fallback={} {} ms]",
            outcome.provider,
            outcome.value.model,
            outcome.attempts,
            outcome.used_fallback,
            outcome.elapsed.as_millis()
        );
    }
    Ok(())
}
