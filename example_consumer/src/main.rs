//! Example consumer: embeds autocrud with a hook that requires a bearer token for writes
//! and soft-deletes rows of tables that have a `deleted_at` column.
//!
//! Run from repo root: `cargo run -p example-consumer`

use async_trait::async_trait;
use autocrud::{
    bootstrap, build_app, shutdown_signal, AppError, Operation, RequestContext, RequestHook, ServiceConfig,
    TableDescriptor,
};
use std::sync::Arc;
use tokio::net::TcpListener;

struct WriteToken {
    token: Option<String>,
}

#[async_trait]
impl RequestHook for WriteToken {
    async fn authorize(&self, ctx: &RequestContext, operation: Operation, _table: &TableDescriptor) -> Result<(), AppError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        if !operation.is_write() {
            return Ok(());
        }
        match ctx.bearer_token() {
            None => Err(AppError::Unauthorized("bearer token required for writes".into())),
            Some(t) if t == expected => Ok(()),
            Some(_) => Err(AppError::Forbidden("token not accepted".into())),
        }
    }

    fn soft_delete_column(&self, table: &TableDescriptor) -> Option<String> {
        table.column("deleted_at").map(|c| c.name.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autocrud=info,example_consumer=info")),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let hook = WriteToken {
        token: std::env::var("WRITE_TOKEN").ok().filter(|t| !t.is_empty()),
    };
    let state = bootstrap(&config, Arc::new(hook)).await?;

    let app = build_app(state, &config);
    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
