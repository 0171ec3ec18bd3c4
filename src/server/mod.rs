//! HTTP API over `TripService`.

mod error;
mod extract;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post, put};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::TripService;
use crate::config::ServerConfig;

pub use error::{ErrorBody, ErrorResponse};
pub use extract::{CurrentUser, bearer_token};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TripService>,
}

impl AppState {
    pub fn new(service: TripService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Auth
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        // Trips
        .route(
            "/api/trips",
            get(handlers::list_trips).post(handlers::create_trip),
        )
        .route(
            "/api/trips/{id}",
            get(handlers::get_trip)
                .put(handlers::update_trip)
                .delete(handlers::delete_trip),
        )
        .route("/api/trips/{id}/summary", get(handlers::trip_summary))
        .route("/api/trips/{id}/settlement", get(handlers::trip_settlement))
        // Participants
        .route(
            "/api/trips/{id}/participants",
            get(handlers::list_participants).post(handlers::add_participant),
        )
        .route(
            "/api/trips/{id}/participants/{participant_id}",
            put(handlers::update_participant),
        )
        // Expenses
        .route(
            "/api/trips/{id}/expenses",
            get(handlers::list_expenses).post(handlers::add_expense),
        )
        .route(
            "/api/trips/{id}/expenses/{expense_id}",
            put(handlers::update_expense).delete(handlers::delete_expense),
        )
        .fallback(extract::not_found)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on an already bound listener until ctrl-c.
pub async fn run(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("API server stopped");
    Ok(())
}

/// Open the database, bind the configured address and serve.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let service = TripService::init(&config.database.to_string_lossy(), config.signer())
        .await
        .context("Failed to open database")?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    run(listener, AppState::new(service)).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
