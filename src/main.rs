use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cash_sim_backend::api;
use cash_sim_backend::config::{init_tracing, load_env, Config};
use cash_sim_backend::manager::SimulationManager;

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = Config::parse();
    info!(data_dir = %config.data_dir.display(), bind_addr = %config.bind_addr, "cash-sim starting");

    let manager = SimulationManager::new(config.data_dir.clone())
        .context("failed to initialize simulation data directory")?;

    let app = api::router(manager);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
