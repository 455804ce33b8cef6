//! hamlog-server - personal ham radio logbook service
//!
//! Startup: parse CLI, load TOML, overlay environment and CLI, initialize
//! tracing, open the database, serve until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hamlog_common::config::{TomlConfig, ENV_CONFIG};
use hamlog_common::db::init_database;
use hamlog_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hamlog-server
#[derive(Parser, Debug)]
#[command(name = "hamlog-server")]
#[command(about = "Personal amateur radio logbook service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut TomlConfig) {
        if let Some(database) = &self.database {
            config.database_path = Some(database.clone());
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn resolve_config(args: &Args) -> Result<TomlConfig> {
    let mut config = TomlConfig::load(args.config.as_deref())?;
    config.apply_env_overrides()?;
    args.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved before tracing exists; its own log lines are dropped
    let config = resolve_config(&args).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "hamlog_server={level},hamlog_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting HamLog server (hamlog-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = config.resolved_database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if config.hamqth_credentials().is_none() {
        warn!("HamQTH credentials not configured; callsign lookups will use the cache only");
    }
    if config.llm_api_key().is_none() {
        warn!("Model API key not configured; /parse will return 503");
    }

    let state = AppState::from_config(pool, &config)?;
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("hamlog-server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("hamlog-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
