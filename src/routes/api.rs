//! Token API route. Every method reaches the handler so that authorization runs before 405.

use crate::handlers::api;
use crate::state::AppState;
use axum::{routing::any, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api", any(api))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(state.body_limit)))
        .with_state(state)
}
