//! Settings read from the environment (`.env` is loaded by the server binary).

use crate::case::{is_valid_identifier, IdentifierCase};
use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_POLICY_DIR: &str = "config";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Controls how much of a server-side failure is shown to clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            other => Err(ConfigError::Invalid {
                name: "CRUDGEN_MODE",
                reason: format!("{} (expected development or production)", other),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Schema whose tables are exposed. Catalog lookups are restricted to it.
    pub schema: String,
    /// Directory holding one `<TABLE>.json` access policy per table.
    pub policy_dir: PathBuf,
    pub mode: RunMode,
    pub identifier_case: IdentifierCase,
    pub bind_addr: String,
    /// Max request body size for the JSON API and management routes.
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let schema = get("CRUDGEN_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        if !is_valid_identifier(&schema) {
            return Err(ConfigError::Invalid {
                name: "CRUDGEN_SCHEMA",
                reason: format!("{:?} is not a plain identifier", schema),
            });
        }
        let mode = get("CRUDGEN_MODE").map(|v| v.parse::<RunMode>()).transpose()?.unwrap_or_default();
        let identifier_case = get("CRUDGEN_IDENTIFIER_CASE")
            .map(|v| v.parse::<IdentifierCase>())
            .transpose()?
            .unwrap_or_default();
        let body_limit = match get("CRUDGEN_BODY_LIMIT") {
            Some(v) => v.parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "CRUDGEN_BODY_LIMIT",
                reason: format!("{:?} is not a byte count", v),
            })?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Settings {
            database_url,
            schema,
            policy_dir: get("CRUDGEN_POLICY_DIR")
                .unwrap_or_else(|| DEFAULT_POLICY_DIR.into())
                .into(),
            mode,
            identifier_case,
            bind_addr: get("CRUDGEN_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            body_limit,
        })
    }
}
