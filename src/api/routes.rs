//! Route handlers.
//!
//! The lifecycle routes live under `/trng/randomNum` and are all `GET`,
//! as existing clients call them that way.

use super::error::{ApiError, Description};
use super::AppState;
use crate::metrics::MetricsSnapshot;
use crate::trng::{GenerationRequest, StatusReport};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

const GENERATED: &str =
    "successful operation; HEX-encoded bit arrays (with leading zeros if required)";
const INITIALIZED: &str = "successful operation; random number generator is ready and random numbers can be requested";
const STANDBY: &str = "successful operation; random number generator has been set to 'standby mode'";

/// Raw query of `getRandom`; values are validated by [`GenerationRequest`].
#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    pub quantity: Option<String>,
    #[serde(rename = "numBits", alias = "bitLength")]
    pub num_bits: Option<String>,
}

/// Body of a successful `getRandom`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomBits {
    pub description: String,
    pub random_bits: Vec<String>,
}

/// Lifecycle routes.
pub fn trng_routes() -> Router<AppState> {
    Router::new()
        .route("/trng/randomNum/getRandom", get(get_random))
        .route("/trng/randomNum/init", get(init))
        .route("/trng/randomNum/shutdown", get(shutdown))
        .route("/trng/status", get(status))
}

/// Probe and metrics routes.
pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

/// GET /trng/randomNum/getRandom?quantity=Q&numBits=N
async fn get_random(
    State(state): State<AppState>,
    query: Result<Query<RandomQuery>, QueryRejection>,
) -> Result<Json<RandomBits>, ApiError> {
    let Query(query) = query?;
    let request = GenerationRequest::parse(
        query.quantity.as_deref(),
        query.num_bits.as_deref(),
        &state.manager.config().limits,
    )?;

    let random_bits = state.manager.generate(&request).await?;
    Ok(Json(RandomBits {
        description: GENERATED.to_string(),
        random_bits,
    }))
}

/// GET /trng/randomNum/init
async fn init(State(state): State<AppState>) -> Result<Json<Description>, ApiError> {
    let outcome = state.manager.initialize().await?;
    tracing::info!(attempt = outcome.attempt, "TRNG initialized on request");
    Ok(Json(Description::new(INITIALIZED)))
}

/// GET /trng/randomNum/shutdown
async fn shutdown(State(state): State<AppState>) -> Result<Json<Description>, ApiError> {
    state.manager.shutdown()?;
    Ok(Json(Description::new(STANDBY)))
}

/// GET /trng/status
async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.manager.status())
}

/// GET /health
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .metrics
        .update(&MetricsSnapshot::from_manager(&state.manager));
    let output = state.metrics.encode()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    ))
}
