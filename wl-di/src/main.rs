//! wl-di - Data Import Microservice
//!
//! **Module Identity:**
//! - Name: wl-di (Data Import)
//! - Port: 5731
//!
//! Responsible for bulk-importing external project and task records from
//! uploaded files (CSV, JSON, Markdown) into the Worklane database, with
//! duplicate resolution and idempotent replay of repeated uploads.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wl_di::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting wl-di (Data Import) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder
    let root_folder = wl_common::config::resolve_root_folder(None, "WORKLANE_ROOT_FOLDER");

    // Step 2: Create root folder directory if missing, locate the database
    let db_path = wl_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());

    // Step 3: Open or create database
    let db_pool = wl_common::db::init_database(&db_path).await?;
    wl_di::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    // Create application state
    let state = AppState::new(db_pool);

    // Build router
    let app = wl_di::build_router(state);

    // Start server
    let port = wl_common::config::resolve_port("WORKLANE_DI_PORT", 5731);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
