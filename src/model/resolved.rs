//! Resolved model: every mounted table with its schemas and routes, indexed by path segment.

use crate::catalog::TableDescriptor;
use crate::model::synth::{ColumnSpec, EntitySchemas};
use serde::Serialize;
use std::collections::HashMap;

/// The five generic operations every table gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

/// List query parameters that page instead of filter.
pub const PAGING_PARAMS: [&str; 4] = ["limit", "offset", "page", "size"];

/// One mounted route. Path uses OpenAPI template syntax (`/orders/{key}`).
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedRoute {
    pub operation: Operation,
    pub method: &'static str,
    pub path: String,
    /// "schema.table" of the table served.
    pub table: String,
    pub request_schema: Option<String>,
    pub response_schema: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table: TableDescriptor,
    pub path_segment: String,
    /// Component-name base, e.g. "OrderItems".
    pub schema_base_name: String,
    /// Primary key, else a UNIQUE key over NOT NULL columns, else the first column.
    pub key_columns: Vec<String>,
    /// False for the first-column fallback: a key value may match several rows.
    pub key_is_unique: bool,
    /// Typed columns in ordinal order.
    pub columns: Vec<ColumnSpec>,
    pub schemas: EntitySchemas,
    pub routes: Vec<GeneratedRoute>,
    pub operations: Vec<Operation>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn key_specs(&self) -> Vec<&ColumnSpec> {
        self.key_columns.iter().filter_map(|k| self.column(k)).collect()
    }

    /// Paging parameter names still available on this table. A filterable column with the
    /// same name takes the name as a filter.
    pub fn paging_params(&self) -> Vec<&'static str> {
        PAGING_PARAMS
            .into_iter()
            .filter(|p| !self.column(p).is_some_and(ColumnSpec::is_filterable))
            .collect()
    }

    /// List ordering: the key, plus every other orderable column when the key is not unique.
    pub fn order_columns(&self) -> Vec<&str> {
        let mut order: Vec<&str> = self.key_columns.iter().map(String::as_str).collect();
        if !self.key_is_unique {
            order.extend(
                self.columns
                    .iter()
                    .filter(|c| !c.is_key && c.is_filterable())
                    .map(|c| c.name.as_str()),
            );
        }
        order
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    entity_by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn new(entities: Vec<ResolvedEntity>) -> Self {
        let entity_by_path = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path_segment.clone(), i))
            .collect();
        ResolvedModel {
            entities,
            entity_by_path,
        }
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn routes(&self) -> impl Iterator<Item = &GeneratedRoute> {
        self.entities.iter().flat_map(|e| e.routes.iter())
    }
}
