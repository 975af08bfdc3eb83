use anyhow::{Context, Result};
use pharmaconnect_backend::{bootstrap, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    bootstrap::run(config).await
}
