//! Frame-Modell des Wire-Protokolls
//!
//! ## Design
//! - Request/Response Pattern: jede Anfrage traegt eine `request_id: u32`
//! - Antworten spiegeln die `request_id` mit Event `ok` oder `error`
//! - Server-Pushes (Broadcasts) tragen immer `request_id = 0`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event-Name einer erfolgreichen Antwort
pub const EVENT_OK: &str = "ok";
/// Event-Name einer Fehler-Antwort
pub const EVENT_ERROR: &str = "error";

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Antworten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    InvalidRequest,
    Conflict,
    Unauthenticated,
    InternalError,
}

/// Payload eines `error`-Frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FehlerAntwort {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Eine einzelne Nachricht auf der Leitung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Korrelations-ID (0 = unaufgeforderter Push)
    pub request_id: u32,
    /// Event-Name, z.B. `join_channel` oder `user_left_voice`
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn neu(request_id: u32, event: impl Into<String>, data: Value) -> Self {
        Self {
            request_id,
            event: event.into(),
            data,
        }
    }

    /// Erstellt einen Server-Push ohne Korrelation
    pub fn push(event: impl Into<String>, data: Value) -> Self {
        Self::neu(0, event, data)
    }

    /// Erfolgs-Antwort auf eine Anfrage
    pub fn ok(request_id: u32, data: Value) -> Self {
        Self::neu(request_id, EVENT_OK, data)
    }

    /// Fehler-Antwort auf eine Anfrage
    pub fn fehler(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        let antwort = FehlerAntwort {
            code,
            message: message.into(),
        };
        Self::neu(
            request_id,
            EVENT_ERROR,
            serde_json::to_value(antwort).unwrap_or(Value::Null),
        )
    }

    pub fn ist_push(&self) -> bool {
        self.request_id == 0
    }

    /// Liest den Fehler-Payload, falls dies ein `error`-Frame ist
    pub fn fehler_antwort(&self) -> Option<FehlerAntwort> {
        if self.event != EVENT_ERROR {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
