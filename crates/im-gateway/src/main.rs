//! IM Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p im-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use im_common::{try_init_tracing, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing(TracingConfig::default()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting IM Gateway...");

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        addr = %config.gateway.address(),
        node = %config.gateway.advertise_address(),
        "Configuration loaded"
    );

    im_gateway::server::run(config).await?;

    Ok(())
}
