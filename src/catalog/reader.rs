//! Read table descriptors from information_schema / pg_catalog.

use crate::catalog::types::{CatalogSnapshot, ColumnDescriptor, ForeignKeyDescriptor, TableDescriptor};
use crate::error::CatalogError;
use regex::Regex;
use sqlx::PgPool;
use std::collections::HashMap;

/// Which part of the catalog to reflect.
#[derive(Clone, Debug)]
pub struct ReflectOptions {
    /// Schemas to read, in priority order. The first one is the default schema for path segments.
    pub schemas: Vec<String>,
    /// Tables matching any pattern (against "table" or "schema.table") are skipped.
    pub exclude: Vec<Regex>,
}

impl Default for ReflectOptions {
    fn default() -> Self {
        ReflectOptions {
            schemas: vec!["public".into()],
            exclude: Vec::new(),
        }
    }
}

impl ReflectOptions {
    pub fn is_excluded(&self, schema: &str, table: &str) -> bool {
        let qualified = format!("{}.{}", schema, table);
        self.exclude
            .iter()
            .any(|re| re.is_match(table) || re.is_match(&qualified))
    }
}

const TABLES_SQL: &str = r#"
SELECT t.table_schema::text AS table_schema,
       t.table_name::text AS table_name,
       obj_description(to_regclass(quote_ident(t.table_schema::text) || '.' || quote_ident(t.table_name::text)), 'pg_class') AS comment
FROM information_schema.tables t
WHERE t.table_type = 'BASE TABLE'
  AND t.table_schema::text = ANY($1)
ORDER BY t.table_schema, t.table_name
"#;

const COLUMNS_SQL: &str = r#"
SELECT c.table_schema::text AS table_schema,
       c.table_name::text AS table_name,
       c.column_name::text AS column_name,
       c.ordinal_position::int4 AS position,
       c.data_type::text AS data_type,
       c.udt_schema::text AS udt_schema,
       c.udt_name::text AS udt_name,
       (c.is_nullable = 'YES') AS nullable,
       c.column_default::text AS column_default,
       c.character_maximum_length::int4 AS max_length,
       (c.is_identity = 'YES') AS is_identity,
       (c.identity_generation IS NOT NULL AND c.identity_generation = 'ALWAYS') AS identity_always,
       (c.is_generated = 'ALWAYS') AS is_generated
FROM information_schema.columns c
WHERE c.table_schema::text = ANY($1)
ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
SELECT kcu.table_schema::text AS table_schema,
       kcu.table_name::text AS table_name,
       kcu.column_name::text AS column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema::text = ANY($1)
ORDER BY kcu.table_schema, kcu.table_name, kcu.ordinal_position
"#;

const UNIQUE_KEYS_SQL: &str = r#"
SELECT tc.constraint_name::text AS constraint_name,
       kcu.table_schema::text AS table_schema,
       kcu.table_name::text AS table_name,
       kcu.column_name::text AS column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'UNIQUE'
  AND tc.table_schema::text = ANY($1)
ORDER BY kcu.table_schema, kcu.table_name, tc.constraint_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
SELECT tc.constraint_name::text AS constraint_name,
       kcu.table_schema::text AS table_schema,
       kcu.table_name::text AS table_name,
       kcu.column_name::text AS column_name,
       ref.table_schema::text AS referenced_schema,
       ref.table_name::text AS referenced_table,
       ref.column_name::text AS referenced_column
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
JOIN information_schema.referential_constraints rc
  ON rc.constraint_schema = tc.constraint_schema
 AND rc.constraint_name = tc.constraint_name
JOIN information_schema.key_column_usage ref
  ON ref.constraint_schema = rc.unique_constraint_schema
 AND ref.constraint_name = rc.unique_constraint_name
 AND ref.ordinal_position = kcu.position_in_unique_constraint
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema::text = ANY($1)
ORDER BY kcu.table_schema, kcu.table_name, tc.constraint_name, kcu.ordinal_position
"#;

const ENUM_LABELS_SQL: &str = r#"
SELECT n.nspname::text AS type_schema,
       t.typname::text AS type_name,
       e.enumlabel::text AS label
FROM pg_catalog.pg_type t
JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
ORDER BY n.nspname, t.typname, e.enumsortorder
"#;

#[derive(sqlx::FromRow)]
struct TableRow {
    table_schema: String,
    table_name: String,
    comment: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ColumnRow {
    table_schema: String,
    table_name: String,
    column_name: String,
    position: i32,
    data_type: String,
    udt_schema: String,
    udt_name: String,
    nullable: bool,
    column_default: Option<String>,
    max_length: Option<i32>,
    is_identity: bool,
    identity_always: bool,
    is_generated: bool,
}

#[derive(sqlx::FromRow)]
struct KeyColumnRow {
    table_schema: String,
    table_name: String,
    column_name: String,
}

#[derive(sqlx::FromRow)]
struct UniqueColumnRow {
    constraint_name: String,
    table_schema: String,
    table_name: String,
    column_name: String,
}

#[derive(sqlx::FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    table_schema: String,
    table_name: String,
    column_name: String,
    referenced_schema: String,
    referenced_table: String,
    referenced_column: String,
}

#[derive(sqlx::FromRow)]
struct EnumLabelRow {
    type_schema: String,
    type_name: String,
    label: String,
}

type TableKey = (String, String);

/// Reflect every base table of `options.schemas` visible to the pool's credentials.
/// Single attempt: a failed catalog query aborts with a connection, permission or load error.
pub async fn load_from_pool(pool: &PgPool, options: &ReflectOptions) -> Result<CatalogSnapshot, CatalogError> {
    let schemas = &options.schemas;

    let table_rows = fetch::<TableRow>(pool, TABLES_SQL, schemas).await?;
    let column_rows = fetch::<ColumnRow>(pool, COLUMNS_SQL, schemas).await?;
    let pk_rows = fetch::<KeyColumnRow>(pool, PRIMARY_KEYS_SQL, schemas).await?;
    let unique_rows = fetch::<UniqueColumnRow>(pool, UNIQUE_KEYS_SQL, schemas).await?;
    let fk_rows = fetch::<ForeignKeyRow>(pool, FOREIGN_KEYS_SQL, schemas).await?;
    tracing::debug!(sql = %ENUM_LABELS_SQL, "catalog query");
    let enum_rows = sqlx::query_as::<_, EnumLabelRow>(ENUM_LABELS_SQL)
        .fetch_all(pool)
        .await
        .map_err(CatalogError::from_sqlx)?;

    let snapshot = assemble(
        table_rows,
        column_rows,
        KeyRows {
            primary: pk_rows,
            unique: unique_rows,
            foreign: fk_rows,
        },
        enum_rows,
        options,
    );
    if snapshot.tables.is_empty() {
        tracing::warn!(schemas = ?schemas, "no tables visible in configured schemas");
    } else {
        tracing::info!(tables = snapshot.tables.len(), schemas = ?schemas, "catalog read");
    }
    Ok(snapshot)
}

async fn fetch<T>(pool: &PgPool, sql: &str, schemas: &[String]) -> Result<Vec<T>, CatalogError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %sql, schemas = ?schemas, "catalog query");
    sqlx::query_as::<_, T>(sql)
        .bind(schemas)
        .fetch_all(pool)
        .await
        .map_err(CatalogError::from_sqlx)
}

/// Constraint rows, one per constrained column.
#[derive(Default)]
struct KeyRows {
    primary: Vec<KeyColumnRow>,
    unique: Vec<UniqueColumnRow>,
    foreign: Vec<ForeignKeyRow>,
}

fn assemble(
    table_rows: Vec<TableRow>,
    column_rows: Vec<ColumnRow>,
    keys: KeyRows,
    enum_rows: Vec<EnumLabelRow>,
    options: &ReflectOptions,
) -> CatalogSnapshot {
    let mut enum_labels: HashMap<TableKey, Vec<String>> = HashMap::new();
    for row in enum_rows {
        enum_labels
            .entry((row.type_schema, row.type_name))
            .or_default()
            .push(row.label);
    }

    let mut order: Vec<TableKey> = Vec::new();
    let mut tables: HashMap<TableKey, TableDescriptor> = HashMap::new();
    for row in table_rows {
        if options.is_excluded(&row.table_schema, &row.table_name) {
            tracing::info!(table = %format!("{}.{}", row.table_schema, row.table_name), "table excluded by pattern");
            continue;
        }
        let mut table = TableDescriptor::new(row.table_schema.clone(), row.table_name.clone(), Vec::new());
        table.comment = row.comment;
        let key = (row.table_schema, row.table_name);
        order.push(key.clone());
        tables.insert(key, table);
    }

    for row in column_rows {
        let Some(table) = tables.get_mut(&(row.table_schema, row.table_name)) else { continue };
        let labels = if row.data_type == "USER-DEFINED" {
            enum_labels
                .get(&(row.udt_schema.clone(), row.udt_name.clone()))
                .cloned()
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        table.columns.push(ColumnDescriptor {
            name: row.column_name,
            position: row.position,
            sql_type: row.data_type,
            udt_schema: row.udt_schema,
            udt_name: row.udt_name,
            nullable: row.nullable,
            default: row.column_default,
            max_length: row.max_length,
            is_identity: row.is_identity,
            identity_always: row.identity_always,
            is_generated: row.is_generated,
            enum_labels: labels,
        });
    }

    for row in keys.primary {
        if let Some(table) = tables.get_mut(&(row.table_schema, row.table_name)) {
            table.primary_key.push(row.column_name);
        }
    }

    // Rows arrive grouped by constraint, so a name change starts a new key.
    let mut last_unique: Option<(TableKey, String)> = None;
    for row in keys.unique {
        let key = (row.table_schema, row.table_name);
        let Some(table) = tables.get_mut(&key) else { continue };
        let same = last_unique
            .as_ref()
            .is_some_and(|(k, name)| *k == key && *name == row.constraint_name);
        if same {
            if let Some(columns) = table.unique_keys.last_mut() {
                columns.push(row.column_name);
            }
        } else {
            table.unique_keys.push(vec![row.column_name]);
            last_unique = Some((key, row.constraint_name));
        }
    }

    for row in keys.foreign {
        let Some(table) = tables.get_mut(&(row.table_schema, row.table_name)) else { continue };
        match table.foreign_keys.iter_mut().find(|fk| fk.name == row.constraint_name) {
            Some(fk) => {
                fk.columns.push(row.column_name);
                fk.referenced_columns.push(row.referenced_column);
            }
            None => table.foreign_keys.push(ForeignKeyDescriptor {
                name: row.constraint_name,
                columns: vec![row.column_name],
                referenced_schema: row.referenced_schema,
                referenced_table: row.referenced_table,
                referenced_columns: vec![row.referenced_column],
            }),
        }
    }

    CatalogSnapshot::new(order.into_iter().filter_map(|k| tables.remove(&k)).collect())
}
