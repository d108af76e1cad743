//! Application configuration.
//!
//! Mirrors `app/config.py`'s single `DATA_DIR` setting, read the way the
//! teacher reads its own env-backed settings (`env::var(...).unwrap_or_else`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "cash-sim-server")]
pub struct Config {
    /// Directory holding one SQLite file per simulation.
    #[arg(long, env = "CASH_SIM_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Address the HTTP server binds to.
    #[arg(long, env = "CASH_SIM_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
}

pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cash_sim_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn load_env() {
    dotenv::dotenv().ok();
}
