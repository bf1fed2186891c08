//! Schema Synthesizer: typed columns and request/response shapes derived from one table descriptor.

use crate::catalog::TableDescriptor;
use crate::error::CatalogError;
use crate::model::semantic::{bind_cast, map_column, SemanticType};
use serde::Serialize;

/// One table column with everything the SQL builder and row decoder need.
#[derive(Clone, Debug, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub semantic: SemanticType,
    pub sql_type: String,
    /// Cast applied to bound parameters, e.g. "integer", "\"public\".\"order_status\"".
    pub bind_type: String,
    pub nullable: bool,
    pub has_default: bool,
    pub writable: bool,
    pub is_key: bool,
}

impl ColumnSpec {
    /// Usable in an equality filter. Plain `json` has no equality operator.
    pub fn is_filterable(&self) -> bool {
        self.sql_type != "json"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Outbound row shape: every column.
    Read,
    /// POST body.
    Create,
    /// PUT body: Create without key columns.
    Replace,
    /// PATCH body: Replace with every field optional.
    Patch,
}

impl SchemaKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            SchemaKind::Read => "",
            SchemaKind::Create => "Create",
            SchemaKind::Replace => "Replace",
            SchemaKind::Patch => "Patch",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub semantic: SemanticType,
    pub sql_type: String,
    pub nullable: bool,
    pub required: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub enum_labels: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GeneratedSchema {
    /// Component name, e.g. "Orders", "OrdersCreate".
    pub name: String,
    pub kind: SchemaKind,
    pub fields: Vec<FieldSpec>,
}

impl GeneratedSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EntitySchemas {
    pub read: GeneratedSchema,
    pub create: GeneratedSchema,
    pub replace: GeneratedSchema,
    pub patch: GeneratedSchema,
}

impl EntitySchemas {
    pub fn all(&self) -> [&GeneratedSchema; 4] {
        [&self.read, &self.create, &self.replace, &self.patch]
    }
}

/// Map every column and build the four schema variants. Fails on the first column whose type is unmapped.
pub fn synthesize(
    table: &TableDescriptor,
    key_columns: &[String],
    base_name: &str,
) -> Result<(Vec<ColumnSpec>, EntitySchemas), CatalogError> {
    let qualified = table.qualified_name();
    let mut columns = Vec::with_capacity(table.columns.len());
    let mut read = Vec::new();
    let mut create = Vec::new();

    for col in &table.columns {
        let semantic = map_column(&qualified, col)?;
        let is_key = key_columns.contains(&col.name);
        let writable = col.is_writable();
        columns.push(ColumnSpec {
            name: col.name.clone(),
            semantic,
            sql_type: col.sql_type.clone(),
            bind_type: bind_cast(col, semantic),
            nullable: col.nullable,
            has_default: col.has_server_default(),
            writable,
            is_key,
        });

        let field = FieldSpec {
            name: col.name.clone(),
            semantic,
            sql_type: col.sql_type.clone(),
            nullable: col.nullable,
            required: true,
            default: col.default.clone(),
            max_length: col.max_length,
            enum_labels: col.enum_labels.clone(),
        };
        if writable {
            create.push(FieldSpec {
                required: !col.nullable && !col.has_server_default(),
                ..field.clone()
            });
        }
        read.push(field);
    }

    let replace: Vec<FieldSpec> = create
        .iter()
        .filter(|f| !key_columns.contains(&f.name))
        .cloned()
        .collect();
    let patch: Vec<FieldSpec> = replace
        .iter()
        .map(|f| FieldSpec {
            required: false,
            ..f.clone()
        })
        .collect();

    let schema = |kind: SchemaKind, fields: Vec<FieldSpec>| GeneratedSchema {
        name: format!("{}{}", base_name, kind.suffix()),
        kind,
        fields,
    };
    let schemas = EntitySchemas {
        read: schema(SchemaKind::Read, read),
        create: schema(SchemaKind::Create, create),
        replace: schema(SchemaKind::Replace, replace),
        patch: schema(SchemaKind::Patch, patch),
    };
    Ok((columns, schemas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDescriptor;

    fn orders() -> TableDescriptor {
        TableDescriptor::new(
            "public",
            "Orders",
            vec![
                ColumnDescriptor::new("id", "integer")
                    .not_null()
                    .with_default("nextval('orders_id_seq'::regclass)"),
                ColumnDescriptor::new("customer_id", "integer").not_null(),
                ColumnDescriptor::new("total", "numeric").not_null(),
                ColumnDescriptor::new("note", "text"),
                ColumnDescriptor::new("total_with_tax", "numeric").generated(),
            ],
        )
        .with_primary_key(&["id"])
    }

    #[test]
    fn create_requires_non_nullable_columns_without_default() {
        let (_, schemas) = synthesize(&orders(), &["id".into()], "Orders").unwrap();
        let required: Vec<&str> = schemas.create.required_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(required, vec!["customer_id", "total"]);
        assert!(schemas.create.field("id").is_some());
        assert!(schemas.create.field("total_with_tax").is_none());
        assert_eq!(schemas.create.name, "OrdersCreate");
    }

    #[test]
    fn replace_drops_keys_and_patch_is_all_optional() {
        let (_, schemas) = synthesize(&orders(), &["id".into()], "Orders").unwrap();
        assert!(schemas.replace.field("id").is_none());
        assert!(schemas.replace.field("customer_id").unwrap().required);
        assert_eq!(schemas.patch.fields.len(), schemas.replace.fields.len());
        assert!(schemas.patch.fields.iter().all(|f| !f.required));
    }

    #[test]
    fn read_schema_lists_every_column() {
        let (columns, schemas) = synthesize(&orders(), &["id".into()], "Orders").unwrap();
        assert_eq!(schemas.read.fields.len(), 5);
        assert_eq!(columns.len(), 5);
        assert!(columns[0].is_key);
        assert!(!columns[4].writable);
        assert_eq!(columns[2].bind_type, "numeric");
    }

    #[test]
    fn unsupported_column_fails_the_table() {
        let table = TableDescriptor::new("public", "shapes", vec![ColumnDescriptor::new("area", "polygon")]);
        let err = synthesize(&table, &[], "Shapes").unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedType { .. }));
    }
}
