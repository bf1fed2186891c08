//! Extension point consulted before every CRUD operation.

use crate::catalog::TableDescriptor;
use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::model::Operation;
use async_trait::async_trait;

/// Installed once in the application state and shared by every request.
#[async_trait]
pub trait RequestHook: Send + Sync {
    /// Reject the request by returning an error (usually `Unauthorized` or `Forbidden`).
    async fn authorize(
        &self,
        _ctx: &RequestContext,
        _operation: Operation,
        _table: &TableDescriptor,
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// Nullable timestamp column that marks a row deleted. Delete stamps it with NOW()
    /// and every other operation only sees rows where it is NULL.
    fn soft_delete_column(&self, _table: &TableDescriptor) -> Option<String> {
        None
    }
}

/// Permits everything, never soft-deletes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl RequestHook for AllowAll {}
