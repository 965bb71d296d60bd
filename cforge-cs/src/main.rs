//! cforge-cs - Content Studio Microservice
//!
//! Authors and refines educational content (books and courses) by
//! orchestrating three hosted LLM providers, persisting documents in a
//! local SQLite content store.
//!
//! Configuration resolves TOML → CLI flags for port/database, and
//! Database → ENV → TOML for provider API keys.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cforge_cs::AppState;

const DEFAULT_PORT: u16 = 5810;

#[derive(Debug, Parser)]
#[command(name = "cforge-cs", about = "Content Studio microservice", version)]
struct Args {
    /// TOML config file path (default: ~/.config/cforge/cforge-cs.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file path (overrides config)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting cforge-cs (Content Studio) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .unwrap_or_else(|| cforge_common::config::default_config_path("cforge-cs"));
    info!("Config: {}", config_path.display());
    let toml_config = cforge_common::config::load_toml_config(&config_path)?;

    let db_path = args
        .database
        .or_else(|| toml_config.database.clone())
        .unwrap_or_else(|| PathBuf::from("cforge.db"));
    info!("Database: {}", db_path.display());

    let db_pool = cforge_cs::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Key resolution needs the settings table, so this runs after init
    let providers = cforge_cs::config::build_provider_set(&db_pool, &toml_config).await?;
    info!("Provider clients initialized");

    let state = AppState::new(db_pool, providers);
    let app = cforge_cs::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
