//! Connection provider and statement execution. One connection per request, no pool.

use crate::error::{AppError, ConfigError};
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{ConnectOptions, Connection, PgConnection};
use std::str::FromStr;

/// Column name to scalar value, in select-list order.
pub type Row = Map<String, Value>;

/// Runs parametrized statements on one open connection.
#[async_trait]
pub trait QueryExecutor: Send {
    async fn fetch_rows(&mut self, q: &QueryBuf) -> Result<Vec<Row>, AppError>;

    /// Returns rows affected.
    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError>;

    async fn close(self: Box<Self>) -> Result<(), AppError>;
}

/// Opens connections on demand.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn QueryExecutor>, AppError>;
}

#[derive(Clone, Debug)]
pub struct PgConnectionProvider {
    options: PgConnectOptions,
}

impl PgConnectionProvider {
    pub fn new(options: PgConnectOptions) -> Self {
        PgConnectionProvider { options }
    }

    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let options = PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: e.to_string(),
        })?;
        Ok(Self::new(options))
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    async fn connect(&self) -> Result<Box<dyn QueryExecutor>, AppError> {
        let conn: PgConnection = self.options.connect().await?;
        Ok(Box::new(conn))
    }
}

#[async_trait]
impl QueryExecutor for PgConnection {
    async fn fetch_rows(&mut self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&mut *self).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let result = query.execute(&mut *self).await?;
        Ok(result.rows_affected())
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        Connection::close(*self).await?;
        Ok(())
    }
}

fn row_to_map(row: &PgRow) -> Row {
    use sqlx::{Column, Row as _, TypeInfo};
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, idx, col.type_info().name()));
    }
    map
}

fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    use sqlx::Row as _;
    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx).ok().flatten().map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx).ok().flatten().map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx).ok().flatten().map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .and_then(|n| serde_json::Number::from_f64(f64::from(n)))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "BOOL" => row.try_get::<Option<bool>, _>(idx).ok().flatten().map(Value::Bool),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx).ok().flatten(),
        _ => row.try_get::<Option<String>, _>(idx).ok().flatten().map(Value::String),
    };
    value.unwrap_or(Value::Null)
}
