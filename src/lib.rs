//! crudgen: catalog-driven CRUD over any PostgreSQL table, with a token-gated JSON API and
//! permission-gated management routes.

pub mod case;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod principal;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use case::IdentifierCase;
pub use config::{RunMode, Settings};
pub use db::{ConnectionProvider, PgConnectionProvider, QueryExecutor, Row};
pub use error::{AppError, ConfigError, ErrorReporter, SchemaError};
pub use principal::{Permission, Principal};
pub use response::{success_many, success_one};
pub use routes::{api_routes, app, common_routes, manage_routes};
pub use schema::{ColumnDescriptor, TableHandle, TableResolver};
pub use service::TableAccessor;
pub use state::AppState;
pub use store::{AccessPolicy, PolicySettings, PolicyStore};
