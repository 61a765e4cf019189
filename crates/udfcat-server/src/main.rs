//! Binary entrypoint for the udfcat HTTP server.
//!
//! Configuration comes from environment variables (see
//! [`udfcat_server::config`]); log filtering from `RUST_LOG` (default
//! `info`).

use tracing_subscriber::EnvFilter;

use udfcat_server::config::ServerConfig;
use udfcat_server::router::build_router;
use udfcat_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().expect("Invalid server configuration");

    let state = AppState::new(&config)
        .await
        .expect("Failed to initialize application state");

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(db_path = %config.db_path, "udfcat server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
