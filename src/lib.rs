//! autocrud: reflect a PostgreSQL catalog at startup and serve a typed CRUD REST API with OpenAPI docs.

pub mod bootstrap;
pub mod case;
pub mod catalog;
pub mod config;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod hooks;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use bootstrap::{bootstrap, build_app, build_state, shutdown_signal};
pub use catalog::{load_from_pool, CatalogSnapshot, ColumnDescriptor, ReflectOptions, TableDescriptor};
pub use config::ServiceConfig;
pub use docs::build_openapi;
pub use error::{AppError, CatalogError, StartupError};
pub use extractors::RequestContext;
pub use hooks::{AllowAll, RequestHook};
pub use model::{resolve, Operation, ResolveOptions, ResolvedEntity, ResolvedModel};
pub use routes::app_router;
pub use service::CrudService;
pub use state::{AppState, Paging};
