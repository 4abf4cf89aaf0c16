//! # Tweetapp
//!
//! HTTP server for the tweet application.
//!
//! ## Environment Variables
//!
//! - `PORT`: Server port (defaults to 3000)
//! - `DATABASE_URL`: PostgreSQL connection string; in-memory storage when unset
//! - `SESSION_KEY`: 64 hex chars sealing session tokens (see `generate_session_key`)
//! - `RUST_LOG`: Log filter for `env_logger`, e.g. `RUST_LOG=info`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use tweetapp::events::EventProducer;
use tweetapp::session::SessionManager;
use tweetapp::store::{get_db_pool, MemoryStore, PgStore};
use tweetapp::{build_router, AppConfig, AppState};

/// Main entry point for the tweet service.
///
/// Loads configuration, picks the store, starts the event consumer and
/// serves HTTP until Ctrl-C or SIGTERM.
///
/// # Example Usage
///
/// ```bash
/// # Run with in-memory storage on port 3000
/// RUST_LOG=info cargo run
///
/// # Run against PostgreSQL on a custom port
/// DATABASE_URL=postgres://localhost/tweetapp PORT=8080 cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize the logging system
    env_logger::init();

    let config = AppConfig::from_env()?;

    let (events, events_handle) = EventProducer::spawn_logging(config.event_buffer);
    let sessions = SessionManager::new(config.session_key.clone(), config.session_ttl_hours)
        .with_secure_cookie(config.cookie_secure);

    let state = match &config.database_url {
        Some(url) => {
            let store = Arc::new(PgStore::new(get_db_pool(url).await?));
            store.ensure_schema().await?;
            AppState::from_store(store, sessions, events, config.bcrypt_cost)
        }
        None => AppState::from_store(
            Arc::new(MemoryStore::new()),
            sessions,
            events,
            config.bcrypt_cost,
        ),
    };

    // Per-IP rate limiting: bursts of 30, refilling one request every 100ms
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(100)
            .burst_size(30)
            .finish()
            .ok_or("invalid rate limiter configuration")?,
    );
    let governor_limiter = governor_conf.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            governor_limiter.retain_recent();
        }
    });

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Starting tweetapp server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    if let Err(e) = &served {
        error!("HTTP server error: {}", e);
    }

    // The router owned the last producers; the consumer drains and exits
    if let Err(e) = events_handle.await {
        error!("Event consumer task failed: {}", e);
    }
    info!("Server stopped");
    served.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
