//! Fehlertypen fuer das Parsen eingehender Frames

use thiserror::Error;

/// Fehler beim Interpretieren eines Frames
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Unbekanntes Ereignis: {0}")]
    UnbekanntesEreignis(String),

    #[error("Ungueltige Daten fuer '{event}': {grund}")]
    UngueltigeDaten { event: String, grund: String },

    #[error("Serialisierungsfehler: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
