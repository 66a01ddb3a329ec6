use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use wattline_charging::{ChargeRegistry, ChargingEngine, ListenerHub};
use wattline_core::config::WattlineConfig;
use wattline_sessions::{SessionStore, SqliteSessionStore};

mod app;
mod args;
mod http;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wattline_gateway=info,wattline_charging=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = WattlineConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        WattlineConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    wattline_sessions::db::init_db(&db)?;
    info!("database migrations complete");

    let store = Arc::new(SqliteSessionStore::new(db));
    let registry = Arc::new(ChargeRegistry::new());
    let hub = Arc::new(ListenerHub::new());
    let engine = Arc::new(ChargingEngine::new(
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::clone(&registry),
        Arc::clone(&hub),
        &config.charging,
    ));

    let grace = Duration::from_secs(config.charging.shutdown_grace_secs);
    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState {
        config,
        store,
        registry,
        hub,
        engine: Arc::clone(&engine),
    });
    let router = app::build_router(Arc::clone(&state));

    // spawn the charging engine loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_loop = Arc::clone(&engine);
    tokio::spawn(async move { engine_loop.run(shutdown_rx).await });

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Wattline gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scan loop first, then give live workers a bounded window
    // to flush their recovery paths before they are abandoned.
    let _ = shutdown_tx.send(true);
    engine.shutdown(grace).await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("ctrl-c received, shutting down");
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
