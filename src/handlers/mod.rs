//! HTTP handlers for the token API and the management routes.

pub mod api;
pub mod manage;
pub use api::api;
pub use manage::*;

use crate::db::QueryExecutor;
use crate::error::AppError;
use crate::service::TableAccessor;
use crate::state::AppState;

/// Close a request's connection. A failed close is logged, never surfaced.
pub(crate) async fn release(conn: Box<dyn QueryExecutor>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "closing connection failed");
    }
}

/// One request's connection plus the accessor for the table it targets.
pub(crate) struct TableSession {
    pub conn: Box<dyn QueryExecutor>,
    pub accessor: TableAccessor,
}

impl TableSession {
    /// Connect and resolve `table`. The connection is closed again if resolution fails.
    pub async fn open(state: &AppState, table: &str) -> Result<Self, AppError> {
        let mut conn = state.db.connect().await?;
        match TableAccessor::open(&state.resolver, conn.as_mut(), table).await {
            Ok(accessor) => Ok(TableSession { conn, accessor }),
            Err(e) => {
                release(conn).await;
                Err(e)
            }
        }
    }

    /// Close the connection and pass `result` through.
    pub async fn finish<T>(self, result: Result<T, AppError>) -> Result<T, AppError> {
        release(self.conn).await;
        result
    }
}
