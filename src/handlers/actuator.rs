// handlers/actuator.rs - GET /actuator/{health,info}

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

/// Liveness plus datastore connectivity
#[utoipa::path(
    get,
    path = "/actuator/health",
    tag = "actuator",
    responses(
        (status = 200, description = "Service and store are up"),
        (status = 503, description = "Store unreachable"),
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    let backend = state.store.backend();

    match state.store.ping().await {
        Ok(()) => Json(json!({
            "status": "UP",
            "components": {
                "store": { "status": "UP", "details": { "backend": backend } }
            }
        }))
        .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "DOWN",
                    "components": {
                        "store": { "status": "DOWN", "details": { "backend": backend } }
                    }
                })),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/actuator/info",
    tag = "actuator",
    responses((status = 200, description = "Build and runtime information"))
)]
pub async fn info(State(state): State<AppState>) -> Response {
    Json(json!({
        "app": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        },
        "environment": state.config.environment,
        "store": state.store.backend(),
    }))
    .into_response()
}
