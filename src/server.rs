//! Axum server exposing the cached measurement

use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/size", get(size_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the latest measurement, or an empty object before the first
/// successful run. Run failures are never surfaced here.
async fn size_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let payload = match state.measurement().await {
        Some(measurement) => serde_json::to_value(&measurement).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize measurement: {}", e);
            serde_json::json!({})
        }),
        None => serde_json::json!({}),
    };
    Json(payload)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sharemeter",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind and run the HTTP endpoint until process termination.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let app = router(state);

    tracing::info!("Serving measurements on http://{}/api/size", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
