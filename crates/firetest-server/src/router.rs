use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router. Data paths are not fixed routes, so everything
/// outside the service endpoints falls through to `dispatch`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/.firetest/health", get(handler::health_handler))
        .route("/.firetest/info", get(handler::info_handler))
        .fallback(handler::dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
