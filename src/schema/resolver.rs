//! Table metadata resolution from `information_schema`. Nothing is cached: every call
//! re-reads the catalog.

use crate::case::IdentifierCase;
use crate::db::{QueryExecutor, Row};
use crate::error::{AppError, SchemaError};
use crate::schema::{ColumnDescriptor, TableHandle};
use crate::sql::{catalog_columns, catalog_primary_key, catalog_tables};

#[derive(Clone, Debug)]
pub struct TableResolver {
    schema: String,
    case: IdentifierCase,
}

fn text<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(|v| v.as_str())
}

fn catalog_error(table: &str, err: AppError) -> AppError {
    SchemaError::Catalog {
        table: table.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn column_from_catalog(table: &str, row: &Row) -> Result<ColumnDescriptor, AppError> {
    let name = text(row, "column_name").ok_or_else(|| SchemaError::Catalog {
        table: table.to_string(),
        reason: "catalog row without column_name".into(),
    })?;
    let mut column = ColumnDescriptor::new(
        name,
        text(row, "data_type").unwrap_or_default(),
        text(row, "is_nullable").is_some_and(|v| v.eq_ignore_ascii_case("YES")),
    );
    if let (Some(udt_schema), Some(udt_name)) = (text(row, "udt_schema"), text(row, "udt_name")) {
        column = column.with_type(udt_schema, udt_name);
    }
    Ok(column)
}

impl TableResolver {
    pub fn new(schema: impl Into<String>, case: IdentifierCase) -> Self {
        TableResolver {
            schema: schema.into(),
            case,
        }
    }

    /// Validated, case-normalized form of a caller-supplied table name.
    pub fn canonical_name(&self, raw: &str) -> Result<String, AppError> {
        self.case.canonical_table(raw)
    }

    /// Columns in catalog order plus the primary key. Only the first column of a composite key
    /// is recognized; the rest are reported and ignored.
    pub async fn resolve(&self, exec: &mut dyn QueryExecutor, table: &str) -> Result<TableHandle, AppError> {
        let table_name = self.canonical_name(table)?;

        let rows = exec
            .fetch_rows(&catalog_columns(&self.schema, &table_name))
            .await
            .map_err(|e| catalog_error(&table_name, e))?;
        if rows.is_empty() {
            return Err(SchemaError::UnknownTable(table_name).into());
        }
        let columns = rows
            .iter()
            .map(|r| column_from_catalog(&table_name, r))
            .collect::<Result<Vec<_>, _>>()?;

        let key_rows = exec
            .fetch_rows(&catalog_primary_key(&self.schema, &table_name))
            .await
            .map_err(|e| catalog_error(&table_name, e))?;
        let key_columns: Vec<&str> = key_rows.iter().filter_map(|r| text(r, "column_name")).collect();
        if key_columns.len() > 1 {
            tracing::warn!(
                table = %table_name,
                key_columns = ?key_columns,
                "composite primary key; only the first column is used"
            );
        }
        let primary_key = key_columns
            .first()
            .filter(|pk| columns.iter().any(|c| c.name == **pk))
            .map(|pk| pk.to_string());

        tracing::debug!(
            table = %table_name,
            columns = columns.len(),
            primary_key = ?primary_key,
            "resolved table"
        );
        Ok(TableHandle {
            schema: self.schema.clone(),
            table_name,
            columns,
            primary_key,
        })
    }

    /// Base tables of the configured schema, sorted by name.
    pub async fn list_tables(&self, exec: &mut dyn QueryExecutor) -> Result<Vec<String>, AppError> {
        let rows = exec
            .fetch_rows(&catalog_tables(&self.schema))
            .await
            .map_err(|e| catalog_error(&self.schema, e))?;
        Ok(rows
            .iter()
            .filter_map(|r| text(r, "table_name"))
            .map(String::from)
            .collect())
    }
}
