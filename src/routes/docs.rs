//! Documentation routes: GET /openapi.json, GET /docs.

use crate::handlers::docs::{docs_ui, openapi_json};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn docs_routes(state: AppState) -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs_ui))
        .with_state(state)
}
