//! Datensaetze des Record Stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treffpunkt_core::{ChannelId, MessageId, Rolle, UserId};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub role: Rolle,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Rolle,
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

/// Art eines Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KanalTyp {
    Text,
    Voice,
}

impl KanalTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

impl std::str::FromStr for KanalTyp {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            other => Err(format!("Unbekannter Kanal-Typ: {other}")),
        }
    }
}

/// Kanal-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanalRecord {
    pub id: ChannelId,
    pub name: String,
    pub description: Option<String>,
    pub channel_type: KanalTyp,
    pub is_private: bool,
    /// `None` fuer vom System angelegte Kanaele
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl KanalRecord {
    pub fn ist_voice(&self) -> bool {
        self.channel_type == KanalTyp::Voice
    }
}

/// Daten zum Erstellen eines neuen Kanals
#[derive(Debug, Clone)]
pub struct NeuerKanal<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub channel_type: KanalTyp,
    pub is_private: bool,
    pub created_by: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Voice-Teilnehmer
// ---------------------------------------------------------------------------

/// Teilnahme eines Benutzers an einem Voice-Kanal
///
/// `username` und `avatar` werden beim Beitritt kopiert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceTeilnehmerRecord {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub is_muted: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NeuerVoiceTeilnehmer<'a> {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub username: &'a str,
    pub avatar: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaktionRecord {
    pub user_id: UserId,
    pub emoji: String,
}

/// Chat-Nachricht inklusive Reaktionen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub content: String,
    pub reactions: Vec<ReaktionRecord>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub username: &'a str,
    pub avatar: Option<&'a str>,
    pub content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanal_typ_roundtrip() {
        for typ in [KanalTyp::Text, KanalTyp::Voice] {
            assert_eq!(typ.als_str().parse::<KanalTyp>().unwrap(), typ);
        }
        assert!("video".parse::<KanalTyp>().is_err());
    }

    #[test]
    fn passwort_hash_wird_nicht_serialisiert() {
        let user = BenutzerRecord {
            id: UserId::new(),
            username: "alice".into(),
            email: None,
            password_hash: "geheim".into(),
            avatar: None,
            role: Rolle::User,
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }
}
