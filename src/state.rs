//! Shared application state for all routes. Nothing here holds a connection: each request opens
//! its own through `db`.

use crate::config::Settings;
use crate::db::{ConnectionProvider, PgConnectionProvider};
use crate::error::{ConfigError, ErrorReporter};
use crate::schema::TableResolver;
use crate::store::PolicyStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn ConnectionProvider>,
    pub resolver: TableResolver,
    pub policies: PolicyStore,
    pub reporter: ErrorReporter,
    /// Max request body in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(db: Arc<dyn ConnectionProvider>, settings: &Settings) -> Self {
        AppState {
            db,
            resolver: TableResolver::new(settings.schema.clone(), settings.identifier_case),
            policies: PolicyStore::new(settings.policy_dir.clone()),
            reporter: ErrorReporter::new(settings.mode),
            body_limit: settings.body_limit,
        }
    }

    /// State backed by PostgreSQL at `settings.database_url`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let db = PgConnectionProvider::from_url(&settings.database_url)?;
        Ok(Self::new(Arc::new(db), settings))
    }
}
