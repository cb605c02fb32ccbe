//! Management routes. The host puts a `Principal` into request extensions before these run.

use crate::handlers::{create_row, delete_row, get_policy, list_tables, put_policy, update_row, view_table};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub fn manage_routes(state: AppState) -> Router {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/:table", get(view_table))
        .route("/tables/:table/rows", post(create_row))
        .route("/tables/:table/rows/:id", patch(update_row).delete(delete_row))
        .route("/tables/:table/policy", get(get_policy).put(put_policy))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(state.body_limit)))
        .with_state(state)
}
