//! HTTP facade over the lifecycle manager.
//!
//! # Endpoints
//!
//! | Route | Success | Failure |
//! |---|---|---|
//! | `GET /trng/randomNum/getRandom?quantity=Q&numBits=N` | 200 | 400, 432, 500 |
//! | `GET /trng/randomNum/init` | 200 | 409, 555, 500 |
//! | `GET /trng/randomNum/shutdown` | 200 | 409 |
//! | `GET /trng/status` | 200 | |
//! | `GET /health` | 200 | |
//! | `GET /metrics` | 200 | 500 |
//!
//! Bodies are JSON objects carrying a `description`; `getRandom` adds
//! `randomBits`, a list of hex strings.

mod error;
mod routes;

pub use error::{ApiError, Description, STATUS_INIT_TIMEOUT, STATUS_NOT_READY};
pub use routes::{RandomBits, RandomQuery};

use crate::metrics::MetricsRegistry;
use crate::trng::TrngManager;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Errors that can occur while serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single lifecycle manager of the process.
    pub manager: Arc<TrngManager>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(manager: Arc<TrngManager>, metrics: MetricsRegistry) -> Self {
        Self {
            manager,
            metrics: Arc::new(metrics),
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let router = Router::new()
        .merge(routes::trng_routes())
        .merge(routes::ops_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "TRNG service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))
}
