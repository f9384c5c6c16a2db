//! `laneboard` binary: serves the board API or checks a database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use laneboard::web::WebServer;
use laneboard::{Board, Config, SqliteStorage};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Laneboard: dense per-lane card ordering service.
#[derive(Parser)]
#[command(name = "laneboard", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config and LANEBOARD_DATABASE).
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Address to bind.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Migrate the database and report whether every lane is dense.
    Check,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.common.config.as_deref()).context("failed to load configuration")?;
    if let Some(database) = cli.common.database {
        config.database.path = database;
    }

    init_tracing(&config.log_level);

    match cli.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(config).await
        }
        Commands::Check => cmd_check(config).await,
    }
}

async fn open_board(config: &Config) -> Result<Board> {
    let path = config.database.path.clone();
    let storage = SqliteStorage::open(path.clone(), config.database.busy_timeout())
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(Board::new(Arc::new(storage)))
}

async fn cmd_serve(config: Config) -> Result<()> {
    let board = open_board(&config).await?;
    let server = WebServer::new(config.server.clone(), board);

    server
        .start(shutdown_signal())
        .await
        .context("web server failed")?;
    Ok(())
}

async fn cmd_check(config: Config) -> Result<()> {
    let board = open_board(&config).await?;
    let reports = board.lane_reports().await.context("failed to read lanes")?;

    let mut broken = 0;
    for report in &reports {
        let state = if report.dense { "dense" } else { "NOT dense" };
        println!("{:<6} {:>5} cards  {}", report.lane, report.count, state);
        if !report.dense {
            broken += 1;
        }
    }

    if broken > 0 {
        anyhow::bail!("{broken} lane(s) have gaps or duplicate positions; reorder them to repair");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
