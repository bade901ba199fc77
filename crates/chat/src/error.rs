//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Nachricht nicht gefunden: {0}")]
    NachrichtNichtGefunden(String),

    #[error("Kanal nicht gefunden: {0}")]
    KanalNichtGefunden(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Keine Berechtigung: {0}")]
    KeineBerechtigung(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Datenbank-Fehler: {0}")]
    DatenbankFehler(#[from] treffpunkt_db::DbError),
}

pub type ChatResult<T> = Result<T, ChatError>;
