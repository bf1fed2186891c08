//! Documentation Publisher: OpenAPI document and Swagger UI, derived from the resolved model.

pub mod openapi;
pub mod ui;

pub use openapi::{build_openapi, ApiInfo};
pub use ui::swagger_ui_html;
