//! Catalog Sync - product catalog webhook exporter
//!
//! Reads the catalog from SQLite, formats it as JSON and posts it to the
//! configured destination. Runs continuously with an interval timer and an
//! HTTP API, or once with --once.

use clap::Parser;
use rusqlite::Connection;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use catalog_sync::settings::SettingsStore;
use catalog_sync::sync::SyncEngine;
use catalog_sync::{init_schema, scheduler, web};

/// Catalog sync server - exports the product catalog to an external endpoint
#[derive(Parser, Debug)]
#[command(name = "catalog_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the catalog SQLite database
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Path to the settings file
    #[arg(short, long, default_value_t = default_settings_path())]
    settings: String,

    /// Port for the HTTP API (trigger + operator endpoints)
    #[arg(short, long, default_value_t = 8787)]
    port: u16,

    /// Bearer token required on operator endpoints (default: open)
    #[arg(long)]
    admin_token: Option<String>,

    /// Run one sync and exit (default: run continuously)
    #[arg(long, default_value_t = false)]
    once: bool,
}

/// Returns the default database path: ~/.local/share/catalog_sync/catalog.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog_sync")
        .join("catalog.db")
        .to_string_lossy()
        .to_string()
}

/// Returns the default settings path: ~/.local/share/catalog_sync/settings.json
fn default_settings_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog_sync")
        .join("settings.json")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);
    let settings_path = PathBuf::from(&args.settings);

    log::info!("Starting catalog_sync...");
    log::info!("Database path: {}", db_path.display());
    log::info!("Settings path: {}", settings_path.display());

    // Ensure parent directories exist
    for path in [&db_path, &settings_path] {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::error!("Failed to create directory {}: {}", parent.display(), e);
                    std::process::exit(1);
                }
                log::info!("Created directory: {}", parent.display());
            }
        }
    }

    // Open catalog database
    let conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize catalog schema: {}", e);
        std::process::exit(1);
    }

    let db = Arc::new(Mutex::new(conn));

    // Load settings, creating the file on first run
    let settings = match SettingsStore::load(&settings_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let engine = SyncEngine::new(Arc::clone(&db), Arc::clone(&settings));

    if args.once {
        let result = engine.run_manual_sync().await;
        if result.success {
            log::info!("{}", result.message);
        } else {
            log::error!("Sync failed: {}", result.message);
            std::process::exit(1);
        }
        return;
    }

    if args.admin_token.is_none() {
        log::warn!("No admin token configured, operator endpoints are unauthenticated");
    }

    // Arm the timer with the persisted interval
    let interval = settings.current().await.sync_interval;
    let scheduler = scheduler::spawn(engine.clone(), interval);

    tokio::select! {
        result = web::serve(
            db,
            settings,
            engine,
            scheduler,
            args.admin_token,
            args.port,
        ) => {
            if let Err(e) = result {
                log::error!("HTTP server error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutdown signal received, stopping");
        }
    }
}
