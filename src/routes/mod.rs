//! Route assembly: service and docs routes at the root, entity routes under the API prefix.

mod common;
mod docs;
mod entity;

pub use common::common_routes;
pub use docs::docs_routes;
pub use entity::entity_routes;

use crate::state::AppState;
use axum::Router;

/// Every route of the service. `api_prefix` is "" or a path like "/api/v1".
pub fn app_router(state: AppState, api_prefix: &str) -> Router {
    let entities = entity_routes(state.clone());
    let router = Router::new()
        .merge(common_routes(state.clone()))
        .merge(docs_routes(state));
    if api_prefix.is_empty() {
        router.merge(entities)
    } else {
        router.nest(api_prefix, entities)
    }
}
