//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;
use treffpunkt_auth::AuthError;
use treffpunkt_chat::ChatError;
use treffpunkt_db::DbError;
use treffpunkt_protocol::{ErrorCode, ProtokollFehler};

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentifizierungsfehler: {0}")]
    Auth(#[from] AuthError),

    #[error("Chat-Fehler: {0}")]
    Chat(#[from] ChatError),

    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] DbError),

    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtokollFehler),

    #[error("Nicht authentifiziert")]
    NichtAuthentifiziert,

    /// Die Verbindung wurde waehrend der Operation getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Zugriff verweigert: {0}")]
    ZugriffVerweigert(String),

    #[error("Konflikt: {0}")]
    Konflikt(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Wire-Fehlercode fuer die `error`-Antwort
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NichtGefunden(_) => ErrorCode::NotFound,
            Self::ZugriffVerweigert(_) => ErrorCode::Forbidden,
            Self::Protokoll(_) => ErrorCode::InvalidRequest,
            Self::Konflikt(_) | Self::VerbindungGetrennt => ErrorCode::Conflict,
            Self::NichtAuthentifiziert => ErrorCode::Unauthenticated,
            Self::Auth(e) => match e {
                AuthError::SessionUngueltig
                | AuthError::SessionAbgelaufen
                | AuthError::UngueltigeEingabe(_) => ErrorCode::InvalidRequest,
                AuthError::UngueltigeAnmeldedaten => ErrorCode::Unauthenticated,
                AuthError::BenutzerNichtGefunden(_) => ErrorCode::NotFound,
                AuthError::BenutzernameVergeben(_) => ErrorCode::Conflict,
                AuthError::Datenbank(db) => db_code(db),
                AuthError::PasswortHashing(_) | AuthError::Intern(_) => ErrorCode::InternalError,
            },
            Self::Chat(e) => match e {
                ChatError::NachrichtNichtGefunden(_)
                | ChatError::KanalNichtGefunden(_)
                | ChatError::BenutzerNichtGefunden(_) => ErrorCode::NotFound,
                ChatError::KeineBerechtigung(_) => ErrorCode::Forbidden,
                ChatError::UngueltigeEingabe(_) => ErrorCode::InvalidRequest,
                ChatError::DatenbankFehler(db) => db_code(db),
            },
            Self::Datenbank(db) => db_code(db),
            Self::Io(_) | Self::Intern(_) => ErrorCode::InternalError,
        }
    }

    /// Text fuer den Client; interne Details bleiben im Log
    pub fn client_meldung(&self) -> String {
        match self.error_code() {
            ErrorCode::InternalError => "Interner Serverfehler".to_string(),
            _ => self.to_string(),
        }
    }
}

fn db_code(e: &DbError) -> ErrorCode {
    match e {
        DbError::NichtGefunden(_) => ErrorCode::NotFound,
        DbError::Eindeutigkeit(_) => ErrorCode::Conflict,
        DbError::UngueltigeDaten(_) => ErrorCode::InvalidRequest,
        _ => ErrorCode::InternalError,
    }
}

pub type SignalingResult<T> = Result<T, SignalingError>;
