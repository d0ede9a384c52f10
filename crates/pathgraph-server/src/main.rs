//! PathGraph server binary.

use pathgraph_server::{ServerConfig, ServerError, serve};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathgraph_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    serve(config).await
}
