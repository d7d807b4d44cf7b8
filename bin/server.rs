// Fee Estimator - Web Server
// JSON API over one in-memory form (no persistence)

use anyhow::{Context, Result};
use fee_estimator::api::{router, AppState};
use fee_estimator::{init_logging, EstimatorConfig, FormState, IndexRateProvider};
use std::env;
use std::path::PathBuf;
use tracing::info;

fn config_path() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("info");

    let config = EstimatorConfig::load(config_path().as_deref())?;
    let form = FormState::from_config(&config).context("Invalid form defaults")?;
    let provider = IndexRateProvider::new(config.index_endpoint.clone());

    info!("Index rate endpoint: {}", provider.endpoint());

    let app = router(AppState::new(form, provider));

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!("Server running on http://{}", config.server_addr);
    info!("Quote requests: {}", config.mailto());

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
