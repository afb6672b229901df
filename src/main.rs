//! registrar-server: serves course listings and records registrations.
//!
//! Configuration via CLI arguments or a TOML file; see `--help`.

use registrar::config::Config;
use registrar::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backlog = config.backlog,
        max_commands = config.max_commands,
        concurrent = config.concurrent,
        "Starting registrar server"
    );

    Server::new(config).run().await?;
    Ok(())
}
