//! Blogr server binary.
//!
//! `serve` starts the HTTP server with structured logging, pending
//! migrations applied and graceful shutdown on SIGTERM/SIGINT. `init-db`
//! drops and recreates the schema.

use blogr_server::{app, config, AppState};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blogr-server", version, about = "A small multi-user blog")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "BLOGR_CONFIG_PATH", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,
    /// Clear existing data and create fresh tables.
    InitDb,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let config = config::load_config(Some(cli.config.as_str()))?;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(path = %cli.config, "resolved startup configuration path");

    ensure_parent_dir(&config.database.path)?;
    let pool = blogr_db::create_pool(
        &config.database.path,
        config.database.runtime_settings(),
    )?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitDb => {
            let conn = pool.get()?;
            blogr_db::init_db(&conn)?;
            println!("Initialized the database.");
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: config::Config, pool: blogr_db::DbPool) -> Result<(), BoxError> {
    {
        let conn = pool.get()?;
        let applied = blogr_db::run_migrations(&conn)?;
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    if config.uses_dev_secret() {
        tracing::warn!("session.secret_key is the development default; set BLOGR_SECRET_KEY in production");
    }

    let app = app(AppState::new(pool, &config.session));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting blogr server");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("blogr server shut down");
    Ok(())
}

/// Creates the directory holding the database file if it is missing.
fn ensure_parent_dir(db_path: &str) -> std::io::Result<()> {
    if db_path == ":memory:" {
        return Ok(());
    }
    match Path::new(db_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
