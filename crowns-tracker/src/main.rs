//! crowns-tracker - Crown collection tracker service
//!
//! Serves the owner and friends API over a SQLite document store, plus the
//! static web assets. Sign-in is handled by the identity proxy in front.

use anyhow::{Context, Result};
use clap::Parser;
use crowns_common::config::{
    find_config_file, CliOverrides, TomlConfig, TrackerConfig, DEFAULT_LOG_LEVEL,
};
use crowns_common::csv_codec::{CsvCodec, DEFAULT_DELIMITER};
use crowns_common::store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crowns_tracker::{build_router, AppState, Tracker};

#[derive(Debug, Parser)]
#[command(name = "crowns-tracker", version, about = "Crown collection tracker service")]
struct Args {
    /// Root folder holding the database
    #[arg(long, env = "CROWNS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "CROWNS_BIND")]
    bind: Option<String>,

    #[arg(long, env = "CROWNS_PORT")]
    port: Option<u16>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "CROWNS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Table used to seed new collections
    #[arg(long, env = "CROWNS_TEMPLATE")]
    template: Option<PathBuf>,

    /// Static assets folder
    #[arg(long, env = "CROWNS_ASSETS")]
    assets: Option<PathBuf>,

    /// Config file (defaults to the platform config location)
    #[arg(long, env = "CROWNS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Read the config file before tracing exists so its log level applies
    let config_path = args.config.clone().or_else(find_config_file);
    let toml_result = config_path.as_deref().map(TomlConfig::load);
    let toml = match &toml_result {
        Some(Ok(toml)) => toml.clone(),
        _ => TomlConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .or_else(|| toml.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting crowns-tracker v{} built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&config_path, &toml_result) {
        (Some(path), Some(Ok(_))) => info!("Config file: {}", path.display()),
        (Some(path), Some(Err(e))) => warn!("Ignoring config {}: {}", path.display(), e),
        _ => info!("No config file found, using defaults"),
    }

    let config = TrackerConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind: args.bind,
            port: args.port,
            log_level: args.log_level,
            template_path: args.template,
            assets_path: args.assets,
        },
        toml,
    );

    config.ensure_root_folder()?;
    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let store = match SqliteStore::open(&db_path).await {
        Ok(store) => {
            info!("✓ Connected to database");
            store
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    match &config.template_path {
        Some(path) => info!("Template: {}", path.display()),
        None => warn!("No template configured; new collections start empty"),
    }
    info!("Assets: {}", config.assets_path.display());

    info!(
        "Columns: {} / {} / {}",
        config.column_labels.name, config.column_labels.small, config.column_labels.large
    );
    let tracker = Tracker::new(Arc::new(store))
        .with_codec(CsvCodec::new(DEFAULT_DELIMITER, config.column_labels.clone()))
        .with_template(config.template_path.clone());
    let state = AppState::new(tracker, config.assets_path.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("crowns-tracker listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
