//! Startup sequence: connect, read the catalog, resolve the model, build the documents and the router.

use crate::catalog::{load_from_pool, CatalogSnapshot};
use crate::config::ServiceConfig;
use crate::docs::{build_openapi, ApiInfo};
use crate::error::StartupError;
use crate::hooks::RequestHook;
use crate::model::resolve;
use crate::routes::app_router;
use crate::state::{soft_delete_columns, AppState, Paging};
use crate::store;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Connect and reflect the configured schemas, then build the state.
pub async fn bootstrap(config: &ServiceConfig, hook: Arc<dyn RequestHook>) -> Result<AppState, StartupError> {
    let pool = store::connect(config).await?;
    let snapshot = load_from_pool(&pool, &config.reflect_options()).await?;
    build_state(pool, &snapshot, config, hook)
}

/// Resolve a snapshot into the shared state. Every table-level failure is reported together.
pub fn build_state(
    pool: PgPool,
    snapshot: &CatalogSnapshot,
    config: &ServiceConfig,
    hook: Arc<dyn RequestHook>,
) -> Result<AppState, StartupError> {
    let model = resolve(snapshot, &config.resolve_options())?;
    let docs = build_openapi(&model, &ApiInfo::default());
    let soft_delete = soft_delete_columns(&model, hook.as_ref());
    Ok(AppState {
        pool,
        model: Arc::new(model),
        hook,
        paging: Paging {
            default_limit: config.default_page_size,
            max_limit: config.max_page_size,
        },
        docs: Arc::new(docs),
        soft_delete: Arc::new(soft_delete),
    })
}

/// Router with the configured body limit and CORS layers.
/// The extractor's own default limit is disabled so the configured limit is the only one.
pub fn build_app(state: AppState, config: &ServiceConfig) -> Router {
    let app = app_router(state, &config.api_prefix)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes));
    if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
