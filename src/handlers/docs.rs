//! Documentation handlers. The document is built once at startup and served as-is.

use crate::docs::swagger_ui_html;
use crate::state::AppState;
use axum::{extract::State, response::Html, Json};
use utoipa::openapi::OpenApi;

pub async fn openapi_json(State(state): State<AppState>) -> Json<OpenApi> {
    Json(state.docs.as_ref().clone())
}

pub async fn docs_ui(State(state): State<AppState>) -> Html<String> {
    Html(swagger_ui_html(&state.docs.info.title, "/openapi.json"))
}
