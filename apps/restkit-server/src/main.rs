mod signals;
mod users;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::http::HeaderName;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use restkit::prelude::*;
use restkit::telemetry::init_logging;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Demo server exposing in-memory users over negotiated REST.
#[derive(Parser)]
#[command(name = "restkit-server")]
#[command(about = "Generic REST resources with content negotiation and live API docs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref()
        && !Path::new(path).is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.set_port(port)?;
    }

    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    // Route construction exercises the pagination and identity checks too.
    users::route(&config.rest)?;
    config.server.socket_addr()?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn build_app(config: &AppConfig) -> Result<axum::Router> {
    let mut router = Router::new(OpenApiInfo::from(&config.rest.openapi)).with_docs(config.rest.docs.clone());
    router.register(users::route(&config.rest)?)?;

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = router
        .into_axum()?
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));
    Ok(app)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, docs = %config.rest.docs.docs_path, "restkit server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(signals::graceful())
        .await
        .context("server terminated abnormally")?;

    tracing::info!("server stopped");
    Ok(())
}
