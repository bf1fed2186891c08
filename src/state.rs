//! Shared application state for all routes. Built once at startup, never mutated.

use crate::hooks::RequestHook;
use crate::model::{ResolvedEntity, ResolvedModel, SemanticType};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::openapi::OpenApi;

/// List page-size bounds.
#[derive(Clone, Copy, Debug)]
pub struct Paging {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Paging {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
    pub hook: Arc<dyn RequestHook>,
    pub paging: Paging,
    pub docs: Arc<OpenApi>,
    /// Soft-delete column per path segment, checked once at startup.
    pub soft_delete: Arc<HashMap<String, String>>,
}

impl AppState {
    pub fn soft_delete_column(&self, entity: &ResolvedEntity) -> Option<&str> {
        self.soft_delete.get(&entity.path_segment).map(String::as_str)
    }
}

/// Ask the hook for each entity's soft-delete column and keep the ones that are nullable timestamp columns.
pub fn soft_delete_columns(model: &ResolvedModel, hook: &dyn RequestHook) -> HashMap<String, String> {
    let mut columns = HashMap::new();
    for entity in &model.entities {
        let Some(name) = hook.soft_delete_column(&entity.table) else { continue };
        match entity.column(&name) {
            Some(col) if col.nullable && col.semantic == SemanticType::DateTime => {
                tracing::info!(table = %entity.table.qualified_name(), column = %name, "soft delete enabled");
                columns.insert(entity.path_segment.clone(), name);
            }
            _ => tracing::warn!(
                table = %entity.table.qualified_name(),
                column = %name,
                "soft-delete column ignored: not a nullable timestamp"
            ),
        }
    }
    columns
}
