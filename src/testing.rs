//! In-memory stand-in for a PostgreSQL connection. It understands exactly the statement shapes
//! the SQL builder emits and keeps a log of everything it ran.

use crate::db::{ConnectionProvider, QueryExecutor, Row};
use crate::error::AppError;
use crate::sql::{BindValue, QueryBuf, COLUMNS_SQL, PRIMARY_KEY_SQL, TABLES_SQL};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

const IDENT: &str = r#""((?:[^"]|"")+)""#;

struct FixtureColumn {
    name: String,
    udt: String,
    nullable: bool,
}

pub struct TableFixture {
    name: String,
    columns: Vec<FixtureColumn>,
    primary_key: Vec<String>,
    rows: Vec<Row>,
    next_id: i64,
}

impl TableFixture {
    pub fn new(name: &str) -> Self {
        TableFixture {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn column(mut self, name: &str, udt: &str, nullable: bool) -> Self {
        self.columns.push(FixtureColumn {
            name: name.to_string(),
            udt: udt.to_string(),
            nullable,
        });
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn row(mut self, value: Value) -> Self {
        let Value::Object(row) = value else {
            panic!("fixture rows must be objects");
        };
        if let Some(id) = self.primary_key.first().and_then(|pk| row.get(pk)).and_then(Value::as_i64) {
            self.next_id = self.next_id.max(id + 1);
        }
        self.rows.push(row);
        self
    }

    fn col(&self, name: &str) -> Option<&FixtureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn ordered(&self, row: &Row) -> Row {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    fn matches(&self, row: &Row, key: &str, id: &Value) -> bool {
        row.get(key) == Some(id)
    }
}

fn data_type(udt: &str) -> &str {
    match udt {
        "int2" => "smallint",
        "int4" => "integer",
        "int8" => "bigint",
        "varchar" => "character varying",
        "bool" => "boolean",
        "float8" => "double precision",
        other => other,
    }
}

fn coerce(col: &FixtureColumn, param: &BindValue) -> Result<Value, String> {
    let Some(s) = param.as_text() else {
        return if col.nullable {
            Ok(Value::Null)
        } else {
            Err(format!("null value in column \"{}\" violates not-null constraint", col.name))
        };
    };
    match col.udt.as_str() {
        "int2" | "int4" | "int8" => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid input syntax for type integer: \"{}\"", s)),
        "float4" | "float8" => s
            .trim()
            .parse::<f64>()
            .map(|f| json!(f))
            .map_err(|_| format!("invalid input syntax for type double precision: \"{}\"", s)),
        "bool" => match s {
            "true" | "t" => Ok(Value::Bool(true)),
            "false" | "f" => Ok(Value::Bool(false)),
            _ => Err(format!("invalid input syntax for type boolean: \"{}\"", s)),
        },
        _ => Ok(Value::String(s.to_string())),
    }
}

fn unquote(s: &str) -> String {
    s.replace("\"\"", "\"")
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

enum Outcome {
    Rows(Vec<Row>),
    Affected(u64),
}

struct Inner {
    schema: String,
    tables: Vec<TableFixture>,
    statements: Vec<String>,
    fail_next: Option<String>,
    refuse: bool,
    opened: usize,
    closed: usize,
}

impl Inner {
    fn table(&self, schema: &str, name: &str) -> Result<&TableFixture, String> {
        self.tables
            .iter()
            .find(|t| schema == self.schema && t.name == name)
            .ok_or_else(|| format!("relation \"{}.{}\" does not exist", schema, name))
    }

    fn table_mut(&mut self, schema: &str, name: &str) -> Result<&mut TableFixture, String> {
        if schema != self.schema {
            return Err(format!("schema \"{}\" does not exist", schema));
        }
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| format!("relation \"{}.{}\" does not exist", schema, name))
    }

    fn run(&mut self, q: &QueryBuf) -> Result<Outcome, String> {
        self.statements.push(q.sql.clone());
        if let Some(msg) = self.fail_next.take() {
            return Err(msg);
        }
        let param = |i: usize| q.params.get(i).cloned().unwrap_or_else(BindValue::null);
        let param_text = |i: usize| param(i).as_text().unwrap_or_default().to_string();

        if q.sql == COLUMNS_SQL {
            let rows: Vec<Row> = match self.table(&param_text(0), &param_text(1)) {
                Ok(t) => t
                    .columns
                    .iter()
                    .map(|c| {
                        let row = json!({
                            "column_name": c.name,
                            "data_type": data_type(&c.udt),
                            "is_nullable": if c.nullable { "YES" } else { "NO" },
                            "udt_schema": "pg_catalog",
                            "udt_name": c.udt,
                        });
                        row.as_object().cloned().unwrap_or_default()
                    })
                    .collect(),
                Err(_) => Vec::new(),
            };
            return Ok(Outcome::Rows(rows));
        }
        if q.sql == PRIMARY_KEY_SQL {
            let rows: Vec<Row> = match self.table(&param_text(0), &param_text(1)) {
                Ok(t) => t
                    .primary_key
                    .iter()
                    .map(|k| json!({ "column_name": k }).as_object().cloned().unwrap_or_default())
                    .collect(),
                Err(_) => Vec::new(),
            };
            return Ok(Outcome::Rows(rows));
        }
        if q.sql == TABLES_SQL {
            let mut names: Vec<&str> = if param_text(0) == self.schema {
                self.tables.iter().map(|t| t.name.as_str()).collect()
            } else {
                Vec::new()
            };
            names.sort();
            let rows: Vec<Row> = names
                .into_iter()
                .map(|n| json!({ "table_name": n }).as_object().cloned().unwrap_or_default())
                .collect();
            return Ok(Outcome::Rows(rows));
        }
        if q.sql == "SELECT 1 AS ok" {
            return Ok(Outcome::Rows(vec![json!({"ok": 1}).as_object().cloned().unwrap_or_default()]));
        }

        let select = re(&format!(r"^SELECT .+ FROM {IDENT}\.{IDENT}(?: WHERE {IDENT} = \$1(?:::.+)?)?$"));
        if let Some(c) = select.captures(&q.sql) {
            let t = self.table(&unquote(&c[1]), &unquote(&c[2]))?;
            let rows: Vec<Row> = match c.get(3) {
                Some(key) => {
                    let key = unquote(key.as_str());
                    let col = t.col(&key).ok_or_else(|| format!("column \"{}\" does not exist", key))?;
                    let id = coerce(col, &param(0))?;
                    t.rows.iter().filter(|r| t.matches(r, &key, &id)).map(|r| t.ordered(r)).collect()
                }
                None => t.rows.iter().map(|r| t.ordered(r)).collect(),
            };
            return Ok(Outcome::Rows(rows));
        }

        let insert = re(&format!(r"^INSERT INTO {IDENT}\.{IDENT} (?:DEFAULT VALUES|\((.+)\) VALUES \((.+)\))$"));
        if let Some(c) = insert.captures(&q.sql) {
            let names: Vec<String> = match c.get(3) {
                Some(cols) => re(IDENT)
                    .captures_iter(cols.as_str())
                    .map(|m| unquote(&m[1]))
                    .collect(),
                None => Vec::new(),
            };
            let t = self.table_mut(&unquote(&c[1]), &unquote(&c[2]))?;
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                let col = t
                    .col(name)
                    .ok_or_else(|| format!("column \"{}\" of relation \"{}\" does not exist", name, t.name))?;
                row.insert(name.clone(), coerce(col, &param(i))?);
            }
            if let Some(pk) = t.primary_key.first().cloned() {
                if row.get(&pk).map_or(true, Value::is_null) {
                    row.insert(pk.clone(), Value::from(t.next_id));
                    t.next_id += 1;
                } else if t.rows.iter().any(|r| r.get(&pk) == row.get(&pk)) {
                    return Err(format!("duplicate key value violates unique constraint on \"{}\"", pk));
                }
            }
            for col in &t.columns {
                if !col.nullable && row.get(&col.name).map_or(true, Value::is_null) {
                    return Err(format!("null value in column \"{}\" violates not-null constraint", col.name));
                }
            }
            t.rows.push(row);
            return Ok(Outcome::Affected(1));
        }

        let update = re(&format!(r"^UPDATE {IDENT}\.{IDENT} SET (.+) WHERE {IDENT} = \$(\d+)(?:::.+)?$"));
        if let Some(c) = update.captures(&q.sql) {
            let sets: Vec<(String, usize)> = re(&format!(r"{IDENT} = \$(\d+)"))
                .captures_iter(&c[3])
                .map(|m| (unquote(&m[1]), m[2].parse::<usize>().unwrap_or(0)))
                .collect();
            let key = unquote(&c[4]);
            let id_index = c[5].parse::<usize>().unwrap_or(0);
            let t = self.table_mut(&unquote(&c[1]), &unquote(&c[2]))?;
            let key_col = t.col(&key).ok_or_else(|| format!("column \"{}\" does not exist", key))?;
            let id = coerce(key_col, &param(id_index - 1))?;
            let mut changes = Vec::with_capacity(sets.len());
            for (name, n) in &sets {
                let col = t
                    .col(name)
                    .ok_or_else(|| format!("column \"{}\" of relation \"{}\" does not exist", name, t.name))?;
                changes.push((name.clone(), coerce(col, &param(n - 1))?));
            }
            let mut affected = 0;
            for row in t.rows.iter_mut().filter(|r| r.get(&key) == Some(&id)) {
                for (name, value) in &changes {
                    row.insert(name.clone(), value.clone());
                }
                affected += 1;
            }
            return Ok(Outcome::Affected(affected));
        }

        let delete = re(&format!(r"^DELETE FROM {IDENT}\.{IDENT} WHERE {IDENT} = \$1(?:::.+)?$"));
        if let Some(c) = delete.captures(&q.sql) {
            let key = unquote(&c[3]);
            let t = self.table_mut(&unquote(&c[1]), &unquote(&c[2]))?;
            let key_col = t.col(&key).ok_or_else(|| format!("column \"{}\" does not exist", key))?;
            let id = coerce(key_col, &param(0))?;
            let before = t.rows.len();
            t.rows.retain(|r| r.get(&key) != Some(&id));
            return Ok(Outcome::Affected((before - t.rows.len()) as u64));
        }

        Err(format!("syntax error in statement: {}", q.sql))
    }
}

/// Shared in-memory database; clones see the same tables and statement log.
#[derive(Clone)]
pub struct MemoryDatabase(Arc<Mutex<Inner>>);

impl MemoryDatabase {
    pub fn new() -> Self {
        MemoryDatabase(Arc::new(Mutex::new(Inner {
            schema: "public".to_string(),
            tables: Vec::new(),
            statements: Vec::new(),
            fail_next: None,
            refuse: false,
            opened: 0,
            closed: 0,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    pub fn with_table(self, table: TableFixture) -> Self {
        self.lock().tables.push(table);
        self
    }

    pub fn executor(&self) -> MemoryExecutor {
        MemoryExecutor { db: self.clone() }
    }

    /// The next statement fails with `message`.
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    pub fn refuse_connections(&self) {
        self.lock().refuse = true;
    }

    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s.starts_with("INSERT") || s.starts_with("UPDATE") || s.starts_with("DELETE"))
            .collect()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let inner = self.lock();
        inner
            .tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.rows.iter().map(|r| t.ordered(r)).collect())
            .unwrap_or_default()
    }

    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.lock().closed
    }
}

#[async_trait]
impl ConnectionProvider for MemoryDatabase {
    async fn connect(&self) -> Result<Box<dyn QueryExecutor>, AppError> {
        let mut inner = self.lock();
        if inner.refuse {
            return Err(AppError::Execution(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }
        inner.opened += 1;
        drop(inner);
        Ok(Box::new(self.executor()))
    }
}

pub struct MemoryExecutor {
    db: MemoryDatabase,
}

fn execution_error(msg: String) -> AppError {
    AppError::Execution(sqlx::Error::Protocol(msg))
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn fetch_rows(&mut self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        match self.db.lock().run(q).map_err(execution_error)? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Affected(_) => Ok(Vec::new()),
        }
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError> {
        match self.db.lock().run(q).map_err(execution_error)? {
            Outcome::Rows(rows) => Ok(rows.len() as u64),
            Outcome::Affected(n) => Ok(n),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        self.db.lock().closed += 1;
        Ok(())
    }
}
