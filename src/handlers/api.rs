//! Token-gated JSON API: `/api?table=T&token=K[&id=N]`.
//!
//! Every request is authorized against the table's stored policy before the method is looked at,
//! so unsupported methods still answer 403 to callers without a valid token.

use crate::db::Row;
use crate::error::AppError;
use crate::handlers::TableSession;
use crate::response::success_marker;
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, FromRequest, Query, Request, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::Value;

pub const TABLE_NAME_HEADER: &str = "X-Table-Name";
pub const RECORD_COUNT_HEADER: &str = "X-Record-Count";

#[derive(Debug, Default, Deserialize)]
pub struct ApiQuery {
    pub table: Option<String>,
    pub token: Option<String>,
    pub id: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
}

pub async fn api(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<ApiQuery>, QueryRejection>,
    request: Request,
) -> Response {
    state.reporter.respond(dispatch(&state, method, query, request).await)
}

async fn dispatch(
    state: &AppState,
    method: Method,
    query: Result<Query<ApiQuery>, QueryRejection>,
    request: Request,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let raw_table = required(query.table, "table")?;
    let token = required(query.token, "token")?;
    let table = state.resolver.canonical_name(&raw_table)?;

    let policy = state
        .policies
        .find(&table)
        .await?
        .ok_or_else(|| AppError::NotFound("table configuration not found".into()))?;
    if !policy.admits(&token) {
        tracing::warn!(table = %table, method = %method, "api access denied");
        return Err(AppError::Authorization("access denied".into()));
    }

    let write = if method == Method::GET || method == Method::HEAD {
        None
    } else if method == Method::PATCH || method == Method::DELETE {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &()).await?;
        Some(RequestValidator::split_id(pairs)?)
    } else {
        return Err(AppError::MethodNotAllowed(method.to_string()));
    };

    let mut session = TableSession::open(state, &table).await?;
    let result = run(&mut session, &method, query.id, write).await;
    session.finish(result).await
}

async fn run(
    session: &mut TableSession,
    method: &Method,
    id: Option<String>,
    write: Option<(Value, Row)>,
) -> Result<Response, AppError> {
    let accessor = &session.accessor;
    let exec = session.conn.as_mut();

    if *method == Method::HEAD {
        let count = accessor.fetch_all(exec).await?.len();
        let name = HeaderValue::from_str(&accessor.handle().table_name)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let mut resp = StatusCode::OK.into_response();
        resp.headers_mut().insert(TABLE_NAME_HEADER, name);
        resp.headers_mut().insert(RECORD_COUNT_HEADER, HeaderValue::from(count));
        return Ok(resp);
    }

    match write {
        None => match id {
            None => Ok(Json(accessor.fetch_all(exec).await?).into_response()),
            // Present but blank names no record.
            Some(id) if id.trim().is_empty() => Err(AppError::NotFound("record not found".into())),
            Some(id) => accessor
                .fetch_by_id(exec, &Value::String(id))
                .await?
                .map(|row| Json(row).into_response())
                .ok_or_else(|| AppError::NotFound("record not found".into())),
        },
        Some((id, data)) => {
            let affected = if *method == Method::PATCH {
                accessor.update(exec, &id, &data).await?
            } else {
                accessor.delete(exec, &id).await?
            };
            tracing::info!(
                table = %accessor.handle().table_name,
                method = %method,
                affected,
                "api write"
            );
            Ok(success_marker().into_response())
        }
    }
}
