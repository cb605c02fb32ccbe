//! Generic table access: read, insert, update and delete any resolved table by primary key.

use crate::db::{QueryExecutor, Row};
use crate::error::AppError;
use crate::schema::{ColumnDescriptor, TableHandle, TableResolver};
use crate::sql::{delete, insert, select_all, select_by_id, update};
use serde_json::Value;

/// CRUD over one table handle. Performs no authorization; callers check permissions first.
/// Each call is a single autocommitted statement on the executor it is given.
#[derive(Clone, Debug)]
pub struct TableAccessor {
    handle: TableHandle,
}

impl TableAccessor {
    pub fn new(handle: TableHandle) -> Self {
        TableAccessor { handle }
    }

    /// Resolve `table` from the catalog and wrap the result.
    pub async fn open(resolver: &TableResolver, exec: &mut dyn QueryExecutor, table: &str) -> Result<Self, AppError> {
        Ok(Self::new(resolver.resolve(exec, table).await?))
    }

    pub fn handle(&self) -> &TableHandle {
        &self.handle
    }

    fn key(&self) -> Result<&ColumnDescriptor, AppError> {
        self.handle
            .primary_key_column()
            .ok_or_else(|| AppError::NoPrimaryKey(self.handle.table_name.clone()))
    }

    /// Every row, unpaginated, in catalog column order.
    pub async fn fetch_all(&self, exec: &mut dyn QueryExecutor) -> Result<Vec<Row>, AppError> {
        exec.fetch_rows(&select_all(&self.handle)).await
    }

    /// First row whose primary key equals `id`.
    pub async fn fetch_by_id(&self, exec: &mut dyn QueryExecutor, id: &Value) -> Result<Option<Row>, AppError> {
        let q = select_by_id(&self.handle, self.key()?, id);
        Ok(exec.fetch_rows(&q).await?.into_iter().next())
    }

    /// Insert one row with the columns named by `data`. Returns rows affected.
    pub async fn insert(&self, exec: &mut dyn QueryExecutor, data: &Row) -> Result<u64, AppError> {
        let n = exec.execute(&insert(&self.handle, data)).await?;
        tracing::debug!(table = %self.handle.table_name, affected = n, "insert");
        Ok(n)
    }

    /// Set the columns named by `data` on the row with key `id`. Returns rows affected.
    pub async fn update(&self, exec: &mut dyn QueryExecutor, id: &Value, data: &Row) -> Result<u64, AppError> {
        let key = self.key()?;
        if data.is_empty() {
            return Err(AppError::Validation("no columns to update".into()));
        }
        let n = exec.execute(&update(&self.handle, key, id, data)).await?;
        tracing::debug!(table = %self.handle.table_name, affected = n, "update");
        Ok(n)
    }

    /// Delete the row with key `id`. Returns rows affected.
    pub async fn delete(&self, exec: &mut dyn QueryExecutor, id: &Value) -> Result<u64, AppError> {
        let n = exec.execute(&delete(&self.handle, self.key()?, id)).await?;
        tracing::debug!(table = %self.handle.table_name, affected = n, "delete");
        Ok(n)
    }
}
