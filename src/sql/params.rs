//! Convert serde_json::Value to the text parameters bound to every statement.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A bound parameter. Always sent as TEXT (or NULL); the placeholder's cast to the column's
/// catalog type does the conversion server-side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindValue(Option<String>);

impl BindValue {
    pub fn null() -> Self {
        BindValue(None)
    }

    pub fn text(s: impl Into<String>) -> Self {
        BindValue(Some(s.into()))
    }

    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue(None),
            Value::Bool(b) => BindValue::text(b.to_string()),
            Value::Number(n) => BindValue::text(n.to_string()),
            Value::String(s) => BindValue::text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::text(v.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(&self, buf: &mut <Postgres as Database>::ArgumentBuffer<'q>) -> Result<IsNull, BoxDynError> {
        <Option<&str> as Encode<Postgres>>::encode_by_ref(&self.0.as_deref(), buf)
    }
}

impl sqlx::Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_become_text() {
        assert_eq!(BindValue::from_json(&json!(42)).as_text(), Some("42"));
        assert_eq!(BindValue::from_json(&json!(1.5)).as_text(), Some("1.5"));
        assert_eq!(BindValue::from_json(&json!(true)).as_text(), Some("true"));
        assert_eq!(BindValue::from_json(&json!("O'Brien")).as_text(), Some("O'Brien"));
    }

    #[test]
    fn null_stays_null() {
        assert_eq!(BindValue::from_json(&Value::Null), BindValue::null());
        assert_eq!(BindValue::null().as_text(), None);
    }

    #[test]
    fn structured_values_become_json_text() {
        assert_eq!(BindValue::from_json(&json!({"a": [1, 2]})).as_text(), Some(r#"{"a":[1,2]}"#));
    }
}
