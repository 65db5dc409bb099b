//! HTTP surface for the similarity service.
//!
//! One scoring route plus a liveness probe. Validation happens here, in
//! contract order: query parameter first, then body shape, then deck
//! size; the store is only reached with a clean request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::deck::Deck;
use crate::engine;
use crate::store::BigramStore;

/// Formats the store is built for.
pub const FORMATS: &[&str] = &[
    "standard", "modern", "pioneer", "vintage", "legacy", "pauper",
];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BigramStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/asi", post(score_handler))
        .fallback(unmatched_route)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Client- and server-side failures, rendered as the API's error body.
struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn missing_parameter() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Missing Parameter",
            message: "The 'format' parameter is required.".to_string(),
        }
    }

    fn invalid_parameter(format: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid Parameter",
            message: format!("The 'format' parameter '{format}' is not supported."),
        }
    }

    fn invalid_json(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid JSON",
            message: message.to_string(),
        }
    }

    fn store_unavailable() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Service Unavailable",
            message: "The archetype store could not be reached.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.error, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct ResponseMeta {
    database: String,
    backend: String,
    #[serde(rename = "exec-ms")]
    exec_ms: f64,
    read_count: u64,
}

#[derive(Serialize)]
struct AsiResponse {
    meta: ResponseMeta,
    /// Archetype name to score, keys in descending-score order.
    data: serde_json::Map<String, serde_json::Value>,
}

async fn score_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<AsiResponse>, ApiError> {
    let format = match params.get("format") {
        Some(format) if !format.is_empty() => format.to_lowercase(),
        _ => return Err(ApiError::missing_parameter()),
    };
    if !FORMATS.contains(&format.as_str()) {
        return Err(ApiError::invalid_parameter(&format));
    }

    let names: Vec<String> = serde_json::from_slice(&body)
        .map_err(|_| ApiError::invalid_json("The request body must be a valid JSON array."))?;
    let deck = Deck::from_names(names);
    if deck.len() < Deck::MIN_CARDS {
        return Err(ApiError::invalid_json(
            "The request body must contain at least two cards.",
        ));
    }

    let bigrams = deck.bigrams();
    debug!(%format, cards = deck.len(), bigrams = bigrams.len(), "scoring deck");

    let lookup = state
        .store
        .lookup(&format, &bigrams)
        .await
        .map_err(|err| {
            error!(%format, "bigram store lookup failed: {err:#}");
            ApiError::store_unavailable()
        })?;

    let mut data = serde_json::Map::new();
    for (archetype, score) in engine::rank(&lookup.rows) {
        data.insert(archetype, json!(round8(score)));
    }

    Ok(Json(AsiResponse {
        meta: ResponseMeta {
            database: state.store.database().to_string(),
            backend: state.store.backend(),
            exec_ms: lookup.meta.exec_ms,
            read_count: lookup.meta.read_count,
        },
        data,
    }))
}

async fn unmatched_route() -> ApiError {
    ApiError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        error: "Invalid request method",
        message: "Did not match any request route handlers.".to_string(),
    }
}

fn round8(score: f64) -> f64 {
    (score * 1e8).round() / 1e8
}
