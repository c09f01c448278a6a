//! roomd - a multi-party line-based chat relay daemon.

use std::sync::Arc;

use roomd::config::{self, Config};
use roomd::network::Gateway;
use roomd::state::room::Room;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load_or_default(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration is invalid");
    }

    info!(
        room = %config.server.room,
        addr = %config.listen.address,
        "Starting roomd"
    );

    let config = Arc::new(config);
    let room = Arc::new(Room::new(config.session.slow_consumer));

    let gateway = Gateway::bind(Arc::clone(&config), room).await?;
    gateway.run().await
}
