//! Table descriptors reflected from the database catalog. Built once at startup, read-only afterwards.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// 1-based position within the table.
    pub position: i32,
    /// `information_schema.columns.data_type`, e.g. "integer", "character varying", "USER-DEFINED".
    pub sql_type: String,
    pub udt_schema: String,
    pub udt_name: String,
    pub nullable: bool,
    /// Default expression as reported by the catalog (e.g. "nextval('orders_id_seq'::regclass)").
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub is_identity: bool,
    /// Identity declared GENERATED ALWAYS: the database rejects explicit values.
    pub identity_always: bool,
    /// Stored generated column: never writable.
    pub is_generated: bool,
    /// Labels of the enum type; empty unless the column is enum-typed.
    pub enum_labels: Vec<String>,
}

impl ColumnDescriptor {
    /// Nullable column of the given SQL type, no default. Position is assigned by [`TableDescriptor::new`].
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        let sql_type = sql_type.into();
        ColumnDescriptor {
            name: name.into(),
            position: 0,
            udt_schema: "pg_catalog".into(),
            udt_name: sql_type.clone(),
            sql_type,
            nullable: true,
            default: None,
            max_length: None,
            is_identity: false,
            identity_always: false,
            is_generated: false,
            enum_labels: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    pub fn with_max_length(mut self, max: i32) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Enum-typed column (`USER-DEFINED` in the catalog).
    pub fn with_enum(mut self, udt_schema: &str, udt_name: &str, labels: &[&str]) -> Self {
        self.sql_type = "USER-DEFINED".into();
        self.udt_schema = udt_schema.to_string();
        self.udt_name = udt_name.to_string();
        self.enum_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    /// Whether the database fills the column when an INSERT omits it.
    pub fn has_server_default(&self) -> bool {
        self.default.is_some() || self.is_identity || self.is_generated
    }

    /// Whether clients may supply a value on insert/update.
    pub fn is_writable(&self) -> bool {
        !self.is_generated && !self.identity_always
    }

    pub fn is_enum(&self) -> bool {
        self.sql_type == "USER-DEFINED" && !self.enum_labels.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub comment: Option<String>,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnDescriptor>,
    /// Primary-key columns in constraint order; empty when the table has no primary key.
    pub primary_key: Vec<String>,
    /// UNIQUE constraints, each in constraint column order.
    pub unique_keys: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                if c.position == 0 {
                    c.position = i as i32 + 1;
                }
                c
            })
            .collect();
        TableDescriptor {
            schema: schema.into(),
            name: name.into(),
            comment: None,
            columns,
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_unique_key(mut self, columns: &[&str]) -> Self {
        self.unique_keys.push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKeyDescriptor) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// "schema.table", used in logs and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// All tables visible at startup, ordered by (schema, table).
#[derive(Clone, Debug, Default, Serialize)]
pub struct CatalogSnapshot {
    pub tables: Vec<TableDescriptor>,
}

impl CatalogSnapshot {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        CatalogSnapshot { tables }
    }

    pub fn table(&self, schema: &str, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.schema == schema && t.name == name)
    }
}
