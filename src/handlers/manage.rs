//! Management handlers: list tables, view a table through its policy, edit rows, edit the policy.
//! Every handler needs a session principal and the permission for its action.

use crate::db::Row;
use crate::error::AppError;
use crate::extractors::CurrentPrincipal;
use crate::handlers::{release, TableSession};
use crate::principal::{Permission, Principal};
use crate::response::{success_many, success_one, success_one_ok, Affected};
use crate::schema::ColumnDescriptor;
use crate::service::RequestValidator;
use crate::state::AppState;
use crate::store::{AccessPolicy, PolicySettings};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// A table as the management view shows it: visible columns only.
#[derive(Serialize)]
pub struct TableView {
    pub table_name: String,
    pub primary_key: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub policy: AccessPolicy,
}

fn is_visible(policy: &AccessPolicy, column: &str) -> bool {
    policy.visible_columns.is_empty() || policy.visible_columns.contains(column)
}

pub async fn list_tables(State(state): State<AppState>, CurrentPrincipal(user): CurrentPrincipal) -> Response {
    state.reporter.respond(tables_for(&state, &user).await)
}

async fn tables_for(state: &AppState, user: &Principal) -> Result<Response, AppError> {
    user.require(Permission::Read)?;
    let mut conn = state.db.connect().await?;
    let result = state.resolver.list_tables(conn.as_mut()).await;
    release(conn).await;
    Ok(success_many(result?).into_response())
}

pub async fn view_table(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path(table): Path<String>,
) -> Response {
    state.reporter.respond(view(&state, &user, &table).await)
}

async fn view(state: &AppState, user: &Principal, table: &str) -> Result<Response, AppError> {
    user.require(Permission::Read)?;
    let table = state.resolver.canonical_name(table)?;
    let policy = state.policies.load(&table).await?;
    let mut session = TableSession::open(state, &table).await?;
    let rows = session.accessor.fetch_all(session.conn.as_mut()).await;
    let handle = session.accessor.handle().clone();
    let rows = session.finish(rows).await?;

    let rows: Vec<Row> = rows
        .into_iter()
        .map(|row| row.into_iter().filter(|(k, _)| is_visible(&policy, k)).collect::<Row>())
        .collect();
    let columns: Vec<ColumnDescriptor> = handle
        .columns
        .into_iter()
        .filter(|c| is_visible(&policy, &c.name))
        .collect();
    let view = TableView {
        table_name: handle.table_name,
        primary_key: handle.primary_key,
        columns,
        rows,
        policy,
    };
    Ok(success_one_ok(view).into_response())
}

pub async fn create_row(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    state.reporter.respond(create(&state, &user, &table, body).await)
}

async fn create(
    state: &AppState,
    user: &Principal,
    table: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    user.require(Permission::Create)?;
    let Json(body) = body?;
    let table = state.resolver.canonical_name(table)?;
    let data = RequestValidator::body_to_row(body)?;
    RequestValidator::check_editable(&data, &state.policies.load(&table).await?)?;

    let mut session = TableSession::open(state, &table).await?;
    let result = session.accessor.insert(session.conn.as_mut(), &data).await;
    let affected = session.finish(result).await?;
    tracing::info!(table = %table, user = %user.username, affected, "row created");
    Ok(success_one(Affected { affected }).into_response())
}

pub async fn update_row(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path((table, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    state.reporter.respond(update(&state, &user, &table, id, body).await)
}

async fn update(
    state: &AppState,
    user: &Principal,
    table: &str,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    user.require(Permission::Update)?;
    let Json(body) = body?;
    let table = state.resolver.canonical_name(table)?;
    let data = RequestValidator::body_to_row(body)?;
    RequestValidator::check_editable(&data, &state.policies.load(&table).await?)?;

    let mut session = TableSession::open(state, &table).await?;
    let result = session
        .accessor
        .update(session.conn.as_mut(), &Value::String(id), &data)
        .await;
    let affected = session.finish(result).await?;
    tracing::info!(table = %table, user = %user.username, affected, "row updated");
    Ok(success_one_ok(Affected { affected }).into_response())
}

pub async fn delete_row(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path((table, id)): Path<(String, String)>,
) -> Response {
    state.reporter.respond(remove(&state, &user, &table, id).await)
}

async fn remove(state: &AppState, user: &Principal, table: &str, id: String) -> Result<Response, AppError> {
    user.require(Permission::Delete)?;
    let table = state.resolver.canonical_name(table)?;

    let mut session = TableSession::open(state, &table).await?;
    let result = session.accessor.delete(session.conn.as_mut(), &Value::String(id)).await;
    let affected = session.finish(result).await?;
    tracing::info!(table = %table, user = %user.username, affected, "row deleted");
    Ok(success_one_ok(Affected { affected }).into_response())
}

pub async fn get_policy(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path(table): Path<String>,
) -> Response {
    state.reporter.respond(read_policy(&state, &user, &table).await)
}

async fn read_policy(state: &AppState, user: &Principal, table: &str) -> Result<Response, AppError> {
    user.require(Permission::Read)?;
    let table = state.resolver.canonical_name(table)?;
    Ok(success_one_ok(state.policies.load(&table).await?).into_response())
}

pub async fn put_policy(
    State(state): State<AppState>,
    CurrentPrincipal(user): CurrentPrincipal,
    Path(table): Path<String>,
    settings: Result<Json<PolicySettings>, JsonRejection>,
) -> Response {
    state.reporter.respond(save_policy(&state, &user, &table, settings).await)
}

/// Only tables that exist in the catalog get a policy file.
async fn save_policy(
    state: &AppState,
    user: &Principal,
    table: &str,
    settings: Result<Json<PolicySettings>, JsonRejection>,
) -> Result<Response, AppError> {
    user.require(Permission::Update)?;
    let Json(settings) = settings?;
    let table = state.resolver.canonical_name(table)?;
    let session = TableSession::open(state, &table).await?;
    session.finish(Ok(())).await?;

    let policy = state.policies.apply_settings(&table, settings).await?;
    tracing::info!(table = %table, user = %user.username, "policy updated");
    Ok(success_one_ok(policy).into_response())
}
