//! # civitas-server
//!
//! HTTP front end for the civic issue tracker.
//!
//! This binary provides:
//! - **REST API** (axum) over the issue lifecycle engine: reporting,
//!   upvotes, boosts, staff workflow, admin console and payment views
//! - **Actor resolution** from the identity gateway's `x-actor-id` header,
//!   re-read from the store on every request
//! - **Startup reconciliation** of the configured admin account

mod api;
mod auth;
mod config;
mod error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use civitas_engine::Engine;
use civitas_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,civitas_server=debug,civitas_engine=debug")
            }),
        )
        .init();

    info!("Starting Civitas server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "opening database");
            Database::open_at(path)?
        }
        None => Database::new()?,
    };
    db.set_busy_timeout(config.busy_timeout)?;

    let mut engine = Engine::new(db, config.engine);

    // -----------------------------------------------------------------------
    // 4. Reconcile the admin account (idempotent)
    // -----------------------------------------------------------------------
    match &config.admin_email {
        Some(email) => {
            let admin = engine.ensure_admin(&config.admin_name, email)?;
            info!(account = %admin.id, email = %admin.email, "Admin account ready");
        }
        None => info!("ADMIN_EMAIL not set, skipping admin reconciliation"),
    }

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState::new(engine, config);

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
