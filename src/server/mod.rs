//! HTTP surface over the engine: JSON in, JSON out.

mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::validator::AddressValidator;

pub fn build_router(validator: AddressValidator) -> Router {
    let state = Arc::new(AppState { validator });

    Router::new()
        .route("/api/fee", post(handlers::resolve_fee))
        .route("/api/validate", post(handlers::validate))
        .route("/api/reverse", get(handlers::reverse))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, validator: AddressValidator) -> std::io::Result<()> {
    let app = build_router(validator);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "zonefee server listening");
    axum::serve(listener, app).await
}
