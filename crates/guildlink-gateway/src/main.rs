//! Guildlink client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p guildlink-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use guildlink_common::{
    try_init_tracing, try_init_tracing_with_config, ClientConfig, ClientError, TracingConfig,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Tracing follows the configured environment when configuration loads
    let config = ClientConfig::from_env();
    let tracing = match &config {
        Ok(config) => try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)),
        Err(_) => try_init_tracing(),
    };
    if let Err(e) = tracing {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            Err(e.into())
        }
    };

    if let Err(e) = result {
        error!(error = %e, code = e.error_code(), "Client stopped");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> Result<(), ClientError> {
    info!(
        env = ?config.app.env,
        gateway = %config.gateway.url,
        "Starting guildlink client..."
    );

    guildlink_gateway::run(config).await
}
