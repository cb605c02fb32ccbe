//! Identifier handling for table names arriving from requests: validation and canonical case.

use crate::error::{AppError, ConfigError};
use regex::Regex;
use std::sync::OnceLock;

/// Plain unquoted identifier: letter or underscore first, then letters, digits, `_`, `$`, `#`.
fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").expect("static identifier pattern"))
}

/// True when `s` is a plain identifier that is safe as a catalog lookup key and as a file stem.
pub fn is_valid_identifier(s: &str) -> bool {
    s.len() <= 128 && identifier_re().is_match(s)
}

/// Case applied to table names before catalog lookup and policy storage.
///
/// PostgreSQL folds unquoted names to lower case; tables created with quoted upper-case names
/// (the layout many migrated schemas keep) need `Upper`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdentifierCase {
    #[default]
    Upper,
    Lower,
    Preserve,
}

impl IdentifierCase {
    pub fn apply(self, s: &str) -> String {
        match self {
            IdentifierCase::Upper => s.to_uppercase(),
            IdentifierCase::Lower => s.to_lowercase(),
            IdentifierCase::Preserve => s.to_string(),
        }
    }

    /// Trim, validate and normalize a table name supplied by a caller.
    pub fn canonical_table(self, raw: &str) -> Result<String, AppError> {
        let trimmed = raw.trim();
        if !is_valid_identifier(trimmed) {
            return Err(AppError::BadRequest(format!("invalid table name: {:?}", raw)));
        }
        Ok(self.apply(trimmed))
    }
}

impl std::str::FromStr for IdentifierCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upper" => Ok(IdentifierCase::Upper),
            "lower" => Ok(IdentifierCase::Lower),
            "preserve" => Ok(IdentifierCase::Preserve),
            other => Err(ConfigError::Invalid {
                name: "CRUDGEN_IDENTIFIER_CASE",
                reason: format!("{} (expected upper, lower or preserve)", other),
            }),
        }
    }
}
