//! Catalog-derived table description, computed once per resolved handle.

use crate::sql::quoted;
use serde::Serialize;

/// Types the row decoder reads directly; anything else is selected as `::text`.
const NATIVE_TYPES: &[&str] = &[
    "int2", "int4", "int8", "float4", "float8", "bool", "uuid", "timestamptz", "timestamp", "date", "json",
    "jsonb", "text", "varchar", "bpchar", "name",
];

/// Underlying catalog type of a column (`udt_schema`, `udt_name`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub schema: String,
    pub name: String,
}

impl TypeRef {
    /// SQL type expression for casts, e.g. `"int4"` or `"sales"."order_status"`.
    pub fn sql(&self) -> String {
        if self.schema == "pg_catalog" {
            quoted(&self.name)
        } else {
            format!("{}.{}", quoted(&self.schema), quoted(&self.name))
        }
    }

    pub fn decodes_natively(&self) -> bool {
        self.schema == "pg_catalog" && NATIVE_TYPES.contains(&self.name.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// Cast target for bound parameters; absent when the catalog gave no underlying type.
    #[serde(skip)]
    pub type_ref: Option<TypeRef>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        ColumnDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            type_ref: None,
        }
    }

    pub fn with_type(mut self, schema: impl Into<String>, name: impl Into<String>) -> Self {
        self.type_ref = Some(TypeRef {
            schema: schema.into(),
            name: name.into(),
        });
        self
    }
}

/// A resolved table. `primary_key`, when set, always names one of `columns`.
#[derive(Clone, Debug, Serialize)]
pub struct TableHandle {
    pub schema: String,
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Option<String>,
}

impl TableHandle {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDescriptor> {
        self.primary_key.as_deref().and_then(|pk| self.column(pk))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_renders_cast_expression() {
        let builtin = TypeRef {
            schema: "pg_catalog".into(),
            name: "int4".into(),
        };
        assert_eq!(builtin.sql(), "\"int4\"");
        assert!(builtin.decodes_natively());

        let custom = TypeRef {
            schema: "sales".into(),
            name: "order_status".into(),
        };
        assert_eq!(custom.sql(), "\"sales\".\"order_status\"");
        assert!(!custom.decodes_natively());

        let numeric = TypeRef {
            schema: "pg_catalog".into(),
            name: "numeric".into(),
        };
        assert!(!numeric.decodes_natively());
    }

    #[test]
    fn primary_key_column_lookup() {
        let handle = TableHandle {
            schema: "public".into(),
            table_name: "USERS".into(),
            columns: vec![
                ColumnDescriptor::new("ID", "integer", false).with_type("pg_catalog", "int4"),
                ColumnDescriptor::new("NAME", "character varying", true),
            ],
            primary_key: Some("ID".into()),
        };
        assert_eq!(handle.primary_key_column().map(|c| c.data_type.as_str()), Some("integer"));
        assert_eq!(handle.column_names().collect::<Vec<_>>(), vec!["ID", "NAME"]);
        assert!(handle.column("EMAIL").is_none());
    }
}
