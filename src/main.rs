use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod db;
mod error;
mod handlers;
mod models;

use crate::config::Config;
use crate::db::{ItemStore, PgItemStore};

/// Shared application state — cheap to clone (the store sits behind an Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,item_service=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.name,
        "Connecting to PostgreSQL..."
    );
    let store = PgItemStore::connect(&config.database).await?;
    info!("Database connection pool established.");

    info!("Running migrations...");
    store.migrate().await?;
    info!("Migrations complete.");

    let store: Arc<dyn ItemStore> = Arc::new(store);
    let app = build_router(AppState {
        store: Arc::clone(&store),
    });

    let addr = config.server_addr();
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Root + health ───────────────────────────────────────────────────
        .route("/", get(handlers::hello))
        .route("/health", get(handlers::health))

        // ── Items CRUD ──────────────────────────────────────────────────────
        .route("/item/list", get(handlers::items::list_items))
        .route("/item/create", post(handlers::items::create_item))
        .route("/item/:id", get(handlers::items::get_item))
        .route("/item/update/:id", patch(handlers::items::update_item))
        .route("/item/del/:id", delete(handlers::items::delete_item))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("item-service"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
