mod app;
mod block_page;
mod config;
mod db;
mod domain;
mod guard;
mod host;
mod infrastructure;
mod scan;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths.logs_dir)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::PhishGuardApp::initialize(config, paths, shutdown).await?;
    app.run().await
}
