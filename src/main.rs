use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use dmi_client::config::Config;
use dmi_client::shell::Shell;
use dmi_client::transport::HttpTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with shell output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());
    tracing::info!(base_url = %config.backend.base_url, "Starting DMI client");

    let transport = Arc::new(HttpTransport::new(&config.backend)?);
    let mut shell = Shell::new(config, transport);
    shell.run().await
}
