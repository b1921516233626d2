//! hanezeve - a small IRC bot
//!
//! Connects to one server, joins the configured channels and answers
//! greetings, CTCP requests and a handful of bang commands.

mod config;
mod handlers;

use crate::config::Config;
use caradhina::Connection;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hanezeve.toml".to_string());

    // Loaded first so the file can supply the default log filter
    let loaded = Config::load(&config_path);
    let default_filter = loaded
        .as_ref()
        .map(|config| config.logging.filter.as_str())
        .unwrap_or("info");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .init();

    let config = loaded.map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        nick = %config.bot.nick,
        "Starting hanezeve"
    );

    let mut conn = Connection::connect(
        (config.server.host.as_str(), config.server.port),
        config.connection_config(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to connect");
        e
    })?;

    conn.join_on_launch(config.bot.channels.iter().cloned());
    handlers::register(
        conn.dispatcher_mut(),
        &config.bot,
        &config.connection.quit_message,
    )?;

    let interrupted = tokio::select! {
        result = conn.launch() => {
            result?;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            true
        }
    };

    if interrupted {
        info!("Interrupted, quitting");
        conn.quit_default().await?;
    }

    info!("Shutdown complete");
    Ok(())
}
