//! Treffpunkt Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use treffpunkt_observability::logging_initialisieren;
use treffpunkt_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = std::env::var("TREFFPUNKT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = ServerConfig::laden(&config_pfad)?;
    config.validieren()?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Treffpunkt Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
