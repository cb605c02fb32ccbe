//! Builds parameterized catalog lookups and SELECT, INSERT, UPDATE, DELETE for a resolved table.
//!
//! Schema, table, key column and cast types come from catalog metadata. Column names taken from
//! caller data are always emitted quoted. Every value is a `$n` parameter.

use crate::schema::{ColumnDescriptor, TableHandle};
use crate::sql::BindValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL, doubling embedded quotes.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableHandle) -> String {
    format!("{}.{}", quoted(&table.schema), quoted(&table.table_name))
}

#[derive(Clone, Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// `$n`, cast to the column's catalog type when the column is known.
fn placeholder(n: usize, column: Option<&ColumnDescriptor>) -> String {
    match column.and_then(|c| c.type_ref.as_ref()) {
        Some(t) => format!("${}::{}", n, t.sql()),
        None => format!("${}", n),
    }
}

/// Every column in catalog order; types the decoder cannot read are selected as text.
fn select_column_list(table: &TableHandle) -> String {
    table
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            match &c.type_ref {
                Some(t) if !t.decodes_natively() => format!("{}::text AS {}", q, q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub const COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, data_type::text AS data_type, \
     is_nullable::text AS is_nullable, udt_schema::text AS udt_schema, udt_name::text AS udt_name \
     FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position";

pub const PRIMARY_KEY_SQL: &str = "SELECT kcu.column_name::text AS column_name \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
     ON kcu.constraint_schema = tc.constraint_schema AND kcu.constraint_name = tc.constraint_name \
     AND kcu.table_name = tc.table_name \
     WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
     ORDER BY kcu.ordinal_position";

pub const TABLES_SQL: &str = "SELECT table_name::text AS table_name FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";

/// Column definitions of one table, in declaration order.
pub fn catalog_columns(schema: &str, table: &str) -> QueryBuf {
    QueryBuf {
        sql: COLUMNS_SQL.to_string(),
        params: vec![BindValue::text(schema), BindValue::text(table)],
    }
}

/// Primary-key columns of one table, in key order.
pub fn catalog_primary_key(schema: &str, table: &str) -> QueryBuf {
    QueryBuf {
        sql: PRIMARY_KEY_SQL.to_string(),
        params: vec![BindValue::text(schema), BindValue::text(table)],
    }
}

pub fn catalog_tables(schema: &str) -> QueryBuf {
    QueryBuf {
        sql: TABLES_SQL.to_string(),
        params: vec![BindValue::text(schema)],
    }
}

/// Connectivity probe for readiness checks.
pub fn probe() -> QueryBuf {
    QueryBuf {
        sql: "SELECT 1 AS ok".to_string(),
        params: Vec::new(),
    }
}

/// SELECT every row, unconditioned and unpaginated.
pub fn select_all(table: &TableHandle) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT {} FROM {}", select_column_list(table), qualified_table(table));
    q
}

/// SELECT by primary key.
pub fn select_by_id(table: &TableHandle, key: &ColumnDescriptor, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::from_json(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        qualified_table(table),
        quoted(&key.name),
        placeholder(n, Some(key))
    );
    q
}

/// INSERT: column list and placeholders straight from `data` keys, in the caller's order.
/// Keys are not checked against the catalog; unknown ones fail at the database.
pub fn insert(table: &TableHandle, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    if data.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES", qualified_table(table));
        return q;
    }
    let mut cols = Vec::with_capacity(data.len());
    let mut placeholders = Vec::with_capacity(data.len());
    for (name, val) in data {
        let n = q.push_param(BindValue::from_json(val));
        cols.push(quoted(name));
        placeholders.push(placeholder(n, table.column(name)));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_table(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by primary key: one SET entry per `data` key. Caller ensures `data` is non-empty.
pub fn update(table: &TableHandle, key: &ColumnDescriptor, id: &Value, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(data.len());
    for (name, val) in data {
        let n = q.push_param(BindValue::from_json(val));
        sets.push(format!("{} = {}", quoted(name), placeholder(n, table.column(name))));
    }
    let id_param = q.push_param(BindValue::from_json(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        qualified_table(table),
        sets.join(", "),
        quoted(&key.name),
        placeholder(id_param, Some(key))
    );
    q
}

/// DELETE by primary key.
pub fn delete(table: &TableHandle, key: &ColumnDescriptor, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::from_json(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        qualified_table(table),
        quoted(&key.name),
        placeholder(n, Some(key))
    );
    q
}
