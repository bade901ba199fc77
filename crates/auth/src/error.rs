//! Fehlertypen fuer den Auth-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),

    #[error("Benutzername oder Passwort falsch")]
    UngueltigeAnmeldedaten,

    #[error("Session nicht gefunden oder ungueltig")]
    SessionUngueltig,

    #[error("Session abgelaufen")]
    SessionAbgelaufen,

    #[error("Benutzername bereits vergeben: {0}")]
    BenutzernameVergeben(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] treffpunkt_db::DbError),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Token unbekannt oder abgelaufen
    pub fn ist_token_fehler(&self) -> bool {
        matches!(self, Self::SessionUngueltig | Self::SessionAbgelaufen)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
