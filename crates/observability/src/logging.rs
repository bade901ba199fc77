//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `TP_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder
//!   `treffpunkt_signaling=debug,info`), Standard: Wert aus der Config
//! - `TP_LOG_FORMAT`: Format (text/json), Standard: Wert aus der Config

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "TP_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "TP_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor den uebergebenen Werten.
/// Faellt auf `info` zurueck wenn die Direktive ungueltig ist.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
