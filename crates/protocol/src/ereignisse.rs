//! Ereignisse des Echtzeit-Kanals
//!
//! Eingehende Client-Ereignisse werden typsicher als [`ClientEreignis`]
//! geparst. Ausgehende Pushes verwenden die Konstanten aus [`namen`] und die
//! Payload-Strukturen dieses Moduls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use treffpunkt_core::{ChannelId, ConnectionId, MessageId, UserId};

use crate::error::{ProtokollFehler, ProtokollResult};
use crate::frame::Frame;

// ---------------------------------------------------------------------------
// Event-Namen
// ---------------------------------------------------------------------------

/// Namen der Server-Pushes
pub mod namen {
    pub const NEW_MESSAGE: &str = "new_message";
    pub const MESSAGE_DELETED: &str = "message_deleted";
    pub const REACTION_ADDED: &str = "reaction_added";
    pub const USER_JOINED_VOICE: &str = "user_joined_voice";
    pub const USER_LEFT_VOICE: &str = "user_left_voice";
    pub const USER_MUTE_CHANGED: &str = "user_mute_changed";
    pub const USER_TYPING: &str = "user_typing";
    pub const USER_STOPPED_TYPING: &str = "user_stopped_typing";
    pub const WEBRTC_OFFER: &str = "webrtc_offer";
    pub const WEBRTC_ANSWER: &str = "webrtc_answer";
    pub const WEBRTC_ICE_CANDIDATE: &str = "webrtc_ice_candidate";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// Alle Event-Namen die ein Client senden darf
const EINGEHENDE_EREIGNISSE: &[&str] = &[
    "authenticate",
    "join_channel",
    "leave_channel",
    "join_voice_room",
    "leave_voice_room",
    "typing_start",
    "typing_stop",
    "webrtc_offer",
    "webrtc_answer",
    "webrtc_ice_candidate",
    "voice_join",
    "voice_leave",
    "voice_participants",
    "voice_mute",
    "voice_kick",
    "send_message",
    "delete_message",
    "add_reaction",
    "ping",
    "pong",
];

// ---------------------------------------------------------------------------
// Eingehende Ereignisse
// ---------------------------------------------------------------------------

/// Vom Client gesendetes Ereignis
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEreignis {
    /// Bindet eine Identitaet an die Verbindung
    Authenticate { token: String },

    // Raum-Mitgliedschaft (Chat-Kanal bzw. Voice-Signalisierung)
    JoinChannel { channel_id: ChannelId },
    LeaveChannel { channel_id: ChannelId },
    JoinVoiceRoom { channel_id: ChannelId },
    LeaveVoiceRoom { channel_id: ChannelId },

    TypingStart { channel_id: ChannelId },
    TypingStop { channel_id: ChannelId },

    // WebRTC-Signalisierung, Payload wird unveraendert weitergereicht
    WebrtcOffer { target: ConnectionId, offer: Value },
    WebrtcAnswer { target: ConnectionId, answer: Value },
    WebrtcIceCandidate { target: ConnectionId, candidate: Value },

    // Voice-Teilnahme
    VoiceJoin { channel_id: ChannelId },
    VoiceLeave { channel_id: ChannelId },
    VoiceParticipants { channel_id: ChannelId },
    VoiceMute { channel_id: ChannelId, muted: bool },
    VoiceKick { channel_id: ChannelId, user_id: UserId },

    // Chat
    SendMessage { channel_id: ChannelId, content: String },
    DeleteMessage { message_id: MessageId },
    AddReaction { message_id: MessageId, emoji: String },

    Ping {
        #[serde(default)]
        timestamp_ms: u64,
    },
    Pong {
        #[serde(default)]
        timestamp_ms: u64,
    },
}

impl ClientEreignis {
    /// Interpretiert einen eingehenden Frame
    pub fn aus_frame(frame: &Frame) -> ProtokollResult<Self> {
        if !EINGEHENDE_EREIGNISSE.contains(&frame.event.as_str()) {
            return Err(ProtokollFehler::UnbekanntesEreignis(frame.event.clone()));
        }

        // Ereignisse ohne Pflichtfelder duerfen `data` weglassen
        let data = match &frame.data {
            Value::Null => Value::Object(Default::default()),
            andere => andere.clone(),
        };

        let mut objekt = serde_json::Map::new();
        objekt.insert("event".into(), Value::String(frame.event.clone()));
        objekt.insert("data".into(), data);

        serde_json::from_value(Value::Object(objekt)).map_err(|e| {
            ProtokollFehler::UngueltigeDaten {
                event: frame.event.clone(),
                grund: e.to_string(),
            }
        })
    }

    /// Ereignisse die ohne gebundene Identitaet erlaubt sind
    pub fn braucht_authentifizierung(&self) -> bool {
        !matches!(
            self,
            Self::Authenticate { .. } | Self::Ping { .. } | Self::Pong { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Payloads
// ---------------------------------------------------------------------------

/// Oeffentliche Sicht auf einen Benutzer (Teil von `user_joined_voice`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenutzerInfo {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub role: String,
    pub is_online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceBeigetreten {
    pub channel_id: ChannelId,
    pub user: BenutzerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceVerlassen {
    pub channel_id: ChannelId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StummGeaendert {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub is_muted: bool,
}

/// Payload von `user_typing` und `user_stopped_typing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tippen {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachrichtGeloescht {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaktionHinzugefuegt {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
}

/// Ein Eintrag der Teilnehmerliste eines Voice-Kanals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeilnehmerInfo {
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub is_muted: bool,
    pub joined_at: DateTime<Utc>,
}

/// Keepalive-Payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keepalive {
    pub timestamp_ms: u64,
}
