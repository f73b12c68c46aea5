//! Labbook Server - Main entry point

use anyhow::Result;
use labbook_common::logging::{init_logging, LogConfig};
use tracing::info;

use labbook_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FILTER from the environment wins over the built-in directives
    let mut log_config = LogConfig::from_env()?.with_file_prefix("labbook-server");
    if log_config.filter_directives.is_none() {
        log_config =
            log_config.with_filter("labbook_server=debug,tower_http=debug,axum=trace,sqlx=info");
    }

    init_logging(&log_config)?;

    info!("Starting Labbook Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await
}
