//! Per-table access policies, persisted as one pretty-printed JSON file per table under the
//! policy directory (`<dir>/<TABLE>.json`).
//!
//! Saves are read-then-write without locking: concurrent saves for the same table race and the
//! last writer wins.

use crate::error::{AppError, PolicyError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

fn empty_as_none<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<String> = Option::deserialize(d)?;
    Ok(v.filter(|s| !s.trim().is_empty()))
}

/// Which columns the management views show and edit, and whether the token API is open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub visible_columns: BTreeSet<String>,
    #[serde(default)]
    pub editable_columns: BTreeSet<String>,
    #[serde(default, rename = "web_service_enabled")]
    pub service_enabled: bool,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Body of a settings save.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PolicySettings {
    #[serde(default)]
    pub visible_columns: BTreeSet<String>,
    #[serde(default)]
    pub editable_columns: BTreeSet<String>,
    #[serde(default)]
    pub web_service_enabled: bool,
    /// Drop the current token. A fresh one is issued in the same save if the service stays enabled.
    #[serde(default)]
    pub clear_token: bool,
}

impl AccessPolicy {
    /// Defaults: nothing restricted, service disabled, no token.
    pub fn new(table_name: impl Into<String>) -> Self {
        AccessPolicy {
            table_name: table_name.into(),
            visible_columns: BTreeSet::new(),
            editable_columns: BTreeSet::new(),
            service_enabled: false,
            api_token: None,
        }
    }

    /// Replace the column sets and enabled flag. A token is issued only when the service ends up
    /// enabled without one; an existing token survives disable and re-enable.
    pub fn apply(&mut self, settings: PolicySettings) -> bool {
        self.visible_columns = settings.visible_columns;
        self.editable_columns = settings.editable_columns;
        self.service_enabled = settings.web_service_enabled;
        if settings.clear_token {
            self.api_token = None;
        }
        if self.service_enabled && self.api_token.is_none() {
            self.api_token = Some(generate_token());
            return true;
        }
        false
    }

    /// Service enabled and `supplied` equals the stored token.
    pub fn admits(&self, supplied: &str) -> bool {
        match &self.api_token {
            Some(token) if self.service_enabled => tokens_match(token, supplied),
            _ => false,
        }
    }
}

/// 32 lowercase hex characters from a random v4 UUID.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Constant-time for equal-length inputs; length mismatch returns early.
pub fn tokens_match(expected: &str, supplied: &str) -> bool {
    let (a, b) = (expected.as_bytes(), supplied.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Clone, Debug)]
pub struct PolicyStore {
    dir: PathBuf,
}

impl PolicyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PolicyStore { dir: dir.into() }
    }

    /// `table` must already be canonical and validated; it is used as the file stem.
    fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }

    /// Persisted policy, or `None` when the table has never been configured.
    pub async fn find(&self, table: &str) -> Result<Option<AccessPolicy>, AppError> {
        let path = self.path_for(table);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PolicyError::Io {
                    path: path.display().to_string(),
                    source,
                }
                .into())
            }
        };
        let mut policy: AccessPolicy = serde_json::from_slice(&bytes).map_err(|source| PolicyError::Format {
            path: path.display().to_string(),
            source,
        })?;
        // The file stem is authoritative.
        policy.table_name = table.to_string();
        Ok(Some(policy))
    }

    /// Persisted policy or defaults.
    pub async fn load(&self, table: &str) -> Result<AccessPolicy, AppError> {
        Ok(self.find(table).await?.unwrap_or_else(|| AccessPolicy::new(table)))
    }

    pub async fn save(&self, policy: &AccessPolicy) -> Result<(), AppError> {
        let io_err = |path: &Path, source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| io_err(&self.dir, e))?;
        let path = self.path_for(&policy.table_name);
        let body = serde_json::to_vec_pretty(policy).map_err(|source| PolicyError::Format {
            path: path.display().to_string(),
            source,
        })?;
        tokio::fs::write(&path, body).await.map_err(|e| io_err(&path, e))?;
        tracing::info!(
            table = %policy.table_name,
            service_enabled = policy.service_enabled,
            path = %path.display(),
            "policy saved"
        );
        Ok(())
    }

    /// Load, apply a settings save, persist, and return the result.
    pub async fn apply_settings(&self, table: &str, settings: PolicySettings) -> Result<AccessPolicy, AppError> {
        let mut policy = self.load(table).await?;
        if policy.apply(settings) {
            tracing::info!(table = %table, "api token issued");
        }
        self.save(&policy).await?;
        Ok(policy)
    }
}
