mod account;
mod config;
mod gateway;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use account::AccountStore;
use config::Config;

#[derive(Parser)]
#[command(
    name = "gatelock",
    version,
    about = "Account authentication service with time-based login lockout"
)]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Remove expired session rows from the database
    CleanupSessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        db: None,
    }) {
        Command::Serve { host, port, db } => {
            let host = host.unwrap_or(cfg.server.host);
            let port = port.unwrap_or(cfg.server.port);
            let db_path = db.unwrap_or(cfg.database.path);

            let store = Arc::new(AccountStore::open(
                &db_path,
                Some(cfg.auth.session_ttl_secs),
            )?);
            tracing::info!("account store opened at {}", db_path.display());

            gateway::run_gateway(&host, port, store).await
        }
        Command::CleanupSessions => {
            let store = AccountStore::open(&cfg.database.path, Some(cfg.auth.session_ttl_secs))?;
            let removed = store.cleanup_expired_sessions()?;
            tracing::info!(removed, "expired sessions removed");
            Ok(())
        }
    }
}
