//! Tic-Tac-Toe DNS Server
//!
//! Binary entry point: logging, configuration, listeners.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tictactoe_dns::{Config, DnsServer, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("configuration error")?;
    info!("Tic-Tac-Toe DNS Server v{}", VERSION);
    info!("Zone: {}", config.zone);
    info!(
        "Session id length: {}, token length: {}",
        config.session_id_length, config.token_length
    );
    info!(
        "Session max age: {:?}, cleanup interval: {:?}",
        config.session_max_age, config.cleanup_interval
    );

    let server = DnsServer::new(config);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server error")?;
    Ok(())
}
