//! Router Generator: bind each reflected table to a path segment, key, schemas and the five CRUD routes.

use crate::case::{to_pascal_case, to_snake_case};
use crate::catalog::{CatalogSnapshot, TableDescriptor};
use crate::error::{CatalogError, StartupError};
use crate::model::resolved::{GeneratedRoute, Operation, ResolvedEntity, ResolvedModel};
use crate::model::synth::{synthesize, EntitySchemas};
use std::collections::HashSet;

/// Segments taken by service routes when entity routes are mounted at the root.
pub const RESERVED_SEGMENTS: &[&str] = &["health", "ready", "version", "docs", "openapi.json"];

#[derive(Clone, Debug)]
pub struct ResolveOptions {
    /// Tables in this schema get bare segments; others are prefixed with their schema.
    pub default_schema: String,
    /// Mount prefix for entity routes ("" or "/api/v1").
    pub api_prefix: String,
    pub read_only: bool,
    /// Abort on any table-level failure instead of excluding the table.
    pub strict: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            default_schema: "public".into(),
            api_prefix: String::new(),
            read_only: false,
            strict: false,
        }
    }
}

/// URL segment for a table: snake_case name, schema-prefixed outside the default schema.
pub fn path_segment_for(table: &TableDescriptor, default_schema: &str) -> String {
    let name = to_snake_case(&table.name);
    if table.schema == default_schema {
        name
    } else {
        format!("{}_{}", to_snake_case(&table.schema), name)
    }
}

/// Build the resolved model from a catalog snapshot.
/// Table-level failures are collected; unless `strict`, the failing tables are left out and logged.
pub fn resolve(snapshot: &CatalogSnapshot, options: &ResolveOptions) -> Result<ResolvedModel, StartupError> {
    let mut entities = Vec::with_capacity(snapshot.tables.len());
    let mut taken: HashSet<String> = HashSet::new();
    let mut failures = Vec::new();

    for table in &snapshot.tables {
        match resolve_table(table, options, &taken) {
            Ok(entity) => {
                taken.insert(entity.path_segment.clone());
                entities.push(entity);
            }
            Err(e) => failures.push(e),
        }
    }

    if !failures.is_empty() {
        if options.strict || failures.iter().any(|e| !e.is_table_scoped()) {
            return Err(StartupError { errors: failures });
        }
        for e in &failures {
            tracing::warn!(error = %e, "table excluded from API");
        }
    }

    for entity in &entities {
        tracing::info!(
            table = %entity.table.qualified_name(),
            path = %format!("{}/{}", options.api_prefix, entity.path_segment),
            operations = ?entity.operations.iter().map(Operation::as_str).collect::<Vec<_>>(),
            "table mounted"
        );
    }
    Ok(ResolvedModel::new(entities))
}

fn resolve_table(
    table: &TableDescriptor,
    options: &ResolveOptions,
    taken: &HashSet<String>,
) -> Result<ResolvedEntity, CatalogError> {
    let qualified = table.qualified_name();
    let segment = path_segment_for(table, &options.default_schema);
    let reserved = options.api_prefix.is_empty() && RESERVED_SEGMENTS.contains(&segment.as_str());
    if segment.is_empty() || reserved || taken.contains(&segment) {
        return Err(CatalogError::DuplicatePathSegment {
            segment,
            table: qualified,
        });
    }

    let (key_columns, key_is_unique) = choose_key(table)?;

    let base_name = to_pascal_case(&segment);
    let (columns, schemas) = synthesize(table, &key_columns, &base_name)?;
    let operations: Vec<Operation> = Operation::ALL
        .into_iter()
        .filter(|op| match op {
            Operation::List | Operation::Get => true,
            Operation::Create => !options.read_only,
            Operation::Update | Operation::Delete => !options.read_only && key_is_unique,
        })
        .collect();
    let routes = routes_for(&options.api_prefix, &segment, &qualified, &schemas);

    Ok(ResolvedEntity {
        table: table.clone(),
        path_segment: segment,
        schema_base_name: base_name,
        key_columns,
        key_is_unique,
        columns,
        schemas,
        routes,
        operations,
    })
}

/// Primary key first, then the first UNIQUE constraint whose columns are all NOT NULL.
/// Otherwise the first column, which does not identify a single row.
fn choose_key(table: &TableDescriptor) -> Result<(Vec<String>, bool), CatalogError> {
    let qualified = table.qualified_name();
    if !table.primary_key.is_empty() {
        return Ok((table.primary_key.clone(), true));
    }
    let not_null = |name: &String| table.column(name).is_some_and(|c| !c.nullable);
    if let Some(unique) = table
        .unique_keys
        .iter()
        .find(|cols| !cols.is_empty() && cols.iter().all(not_null))
    {
        tracing::info!(table = %qualified, key = ?unique, "no primary key; keyed by unique constraint");
        return Ok((unique.clone(), true));
    }
    let first = table
        .columns
        .first()
        .ok_or_else(|| CatalogError::EmptyTable(qualified.clone()))?;
    tracing::warn!(
        table = %qualified,
        column = %first.name,
        "no primary or unique key; keyed by first column, updates and deletes disabled"
    );
    Ok((vec![first.name.clone()], false))
}

fn routes_for(prefix: &str, segment: &str, table: &str, schemas: &EntitySchemas) -> Vec<GeneratedRoute> {
    let collection = format!("{}/{}", prefix, segment);
    let item = format!("{}/{{key}}", collection);
    let read = Some(schemas.read.name.clone());
    let route = |operation, method, path: &str, request: Option<&str>, response: Option<String>| GeneratedRoute {
        operation,
        method,
        path: path.to_string(),
        table: table.to_string(),
        request_schema: request.map(str::to_string),
        response_schema: response,
    };
    vec![
        route(Operation::List, "GET", &collection, None, Some(format!("{}Page", schemas.read.name))),
        route(Operation::Create, "POST", &collection, Some(&schemas.create.name), read.clone()),
        route(Operation::Get, "GET", &item, None, read.clone()),
        route(Operation::Update, "PUT", &item, Some(&schemas.replace.name), read.clone()),
        route(Operation::Update, "PATCH", &item, Some(&schemas.patch.name), read),
        route(Operation::Delete, "DELETE", &item, None, None),
    ]
}
