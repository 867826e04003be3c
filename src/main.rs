//! Pendulum TRNG Service CLI
//!
//! Runs the HTTP service, or a one-shot self-test or generation against
//! the configured entropy source.

use clap::{Parser, Subcommand};
use pendulum_trng::{
    api::{self, AppState},
    config::FileConfig,
    metrics::MetricsRegistry,
    trng::{GenerationRequest, TrngManager},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Pendulum TRNG service
#[derive(Parser, Debug)]
#[command(name = "pendulum-trng")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP interface
    Serve {
        /// Address to bind to, overriding the config file
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run the self-test once and report the outcome
    SelfTest,
    /// Initialize, print random hex strings, and shut down
    Generate {
        /// Number of bit strings
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
        /// Bits per string
        #[arg(short, long, default_value_t = 256)]
        bits: i64,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    if let Command::Serve { bind: Some(bind) } = &cli.command {
        config.server.bind_addr = bind.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_manager(config: &FileConfig) -> Result<Arc<TrngManager>, Box<dyn std::error::Error>> {
    let source = config.open_source()?;
    Ok(TrngManager::new(
        source,
        config.validator(),
        config.manager_config(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C; stop the process to exit");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn serve(config: FileConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let manager = build_manager(&config)?;
    let state = AppState::new(manager, MetricsRegistry::new()?);
    let router = api::build_router(state, config.server.cors_permissive);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    api::serve(listener, router, shutdown_signal()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn self_test(config: FileConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let manager = build_manager(&config)?;

    let result = manager.initialize().await;
    println!("{}", serde_json::to_string_pretty(&manager.status())?);

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            warn!(error = %e, "Self-test did not pass");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn generate(
    config: FileConfig,
    quantity: i64,
    bits: i64,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let request = GenerationRequest::new(quantity, bits, &config.manager.limits)?;
    let manager = build_manager(&config)?;

    manager.initialize().await?;
    for value in manager.generate(&request).await? {
        println!("{}", value);
    }
    manager.shutdown()?;

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    info!("Pendulum TRNG v{}", pendulum_trng::VERSION);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        bind_addr = %config.server.bind_addr,
        source = ?config.source.kind,
        init_timeout_ms = config.manager.init_timeout_ms,
        "Configuration loaded"
    );

    let result = match cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::SelfTest => self_test(config).await,
        Command::Generate { quantity, bits } => generate(config, quantity, bits).await,
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    })
}
