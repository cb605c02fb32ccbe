//! The authenticated caller as attached by the host's session layer: a plain permission set.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Create => "create",
            Permission::Read => "read",
            Permission::Update => "update",
            Permission::Delete => "delete",
        }
    }
}

/// A user with a named access level. The level is only a label; `permissions` decides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub level: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(id: i64, username: impl Into<String>, level: impl Into<String>) -> Self {
        Principal {
            id,
            username: username.into(),
            level: level.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(perms);
        self
    }

    pub fn has_permission(&self, p: Permission) -> bool {
        self.permissions.contains(&p)
    }

    pub fn require(&self, p: Permission) -> Result<(), AppError> {
        if self.has_permission(p) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("{} permission required", p.as_str())))
        }
    }
}
