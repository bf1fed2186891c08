//! autocrud server: reads DATABASE_URL and AUTOCRUD_* from the environment (or .env).

use autocrud::{bootstrap, build_app, shutdown_signal, AllowAll, ServiceConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autocrud=info")),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let state = match bootstrap(&config, Arc::new(AllowAll)).await {
        Ok(state) => state,
        Err(e) => {
            for err in &e.errors {
                tracing::error!(error = %err, "startup failure");
            }
            return Err(e.into());
        }
    };
    tracing::info!(tables = state.model.entities.len(), "model resolved");

    let app = build_app(state, &config);
    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
