//! Storegate storefront server
//!
//! Serves every store on its own subdomain of the main domain:
//! - `acme.shop.example/` is answered by the `acme` store's pages
//! - reserved labels (`www`, `admin`, ...) are refused
//! - unknown labels land on the store-not-found page
//! - checkout writes are rolled back when a step fails
//!
//! Usage:
//! ```bash
//! # With a config file
//! storegate-server --config storegate.yaml
//!
//! # Overriding the main domain (env vars and flags override the file)
//! STOREGATE_STORES_FILE=./stores.yaml storegate-server --main-domain shop.example
//!
//! # Validate a config without starting
//! storegate-server --config storegate.yaml check-config
//! ```
//!
//! Test locally with:
//! ```bash
//! curl -H 'Host: acme.localhost:3000' http://127.0.0.1:3000/
//! curl -H 'Host: acme.localhost:3000' http://127.0.0.1:3000/checkout \
//!   -H 'Content-Type: application/json' \
//!   -d '{"address": {"line1": "1 Main St"}, "lines": [{"product_id": "p1", "quantity": 1, "unit_price_cents": 1999}]}'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use storegate_observability::{Metrics, ReadinessChecker};
use storegate_server::{AppState, ServerConfig, ServerReadiness, build_app, build_backends};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const VERSION: &str = env!("VERSION");
const SHA: &str = env!("SHA");

/// Storegate - multi-tenant storefront server
#[derive(Parser)]
#[command(name = "storegate-server")]
#[command(about = "Subdomain-routed storefront server", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "STOREGATE_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Main domain stores are served under (e.g. shop.example)
    #[arg(long, value_name = "DOMAIN", global = true)]
    main_domain: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // File, then environment, then CLI flags
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    if let Some(main_domain) = cli.main_domain {
        config.tenancy.main_domain = Some(main_domain);
    }
    config.validate()?;

    init_tracing(&config)?;

    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    match cli.command {
        Some(Commands::CheckConfig) => {
            println!("{}", serde_yaml::to_string(&config)?);
            println!("Configuration is valid");
            Ok(())
        }
        Some(Commands::Serve) | None => serve(config).await,
    }
}

fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_new(&config.logging.level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!(
                "Invalid log level '{}' ({}), using info",
                config.logging.level, e
            );
            EnvFilter::new("info")
        }
    };

    if config.logging.json {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("Starting storegate {} ({})", VERSION, SHA);

    let backends = build_backends(&config).await?;

    if config.directory.watch
        && let Some(registry) = &backends.registry
    {
        let mut reloads = registry.watch()?;
        tokio::spawn(async move {
            while let Some(result) = reloads.next().await {
                match result {
                    Ok(version) => debug!("Serving store registry version {}", version),
                    Err(e) => warn!("Store registry not reloaded: {}", e),
                }
            }
        });
    }

    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
    let readiness = Arc::new(ServerReadiness::new(backends.directory_source()));

    let state = AppState::new(
        backends.directory.clone(),
        backends.documents.clone(),
        backends.files.clone(),
        metrics,
    );
    let checker: Arc<dyn ReadinessChecker> = readiness.clone();
    let app = build_app(state, config.tenancy.clone(), Some(checker));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;
    readiness.set_serving(true);

    info!("Storegate listening on http://{}", addr);
    match &config.tenancy.main_domain {
        Some(domain) => info!("   Stores:     http://<store>.{}/", domain),
        None => info!("   Stores:     http://<store>.localhost:{}/", config.port),
    }
    info!("   Health:     http://{}/healthz", addr);
    info!("   Readiness:  http://{}/readyz", addr);
    info!("   Metrics:    http://{}/metrics", addr);

    let shutdown_readiness = readiness.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_readiness.set_serving(false);
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
