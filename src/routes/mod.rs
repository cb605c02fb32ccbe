//! Routers: common (health/ready/version), the token API and the management routes.

mod api;
mod common;
mod manage;

pub use api::api_routes;
pub use common::common_routes;
pub use manage::manage_routes;

use crate::state::AppState;
use axum::Router;

/// Every route the crate serves, merged.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(api_routes(state.clone()))
        .merge(manage_routes(state))
}
