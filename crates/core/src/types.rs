//! Gemeinsame Identifikationstypen fuer Treffpunkt
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Erzeugt einen UUID-Newtype mit `new`, `inner`, `Display` und `FromStr`
macro_rules! id_typ {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_typ!(
    /// Eindeutige Benutzer-ID
    UserId,
    "user"
);

id_typ!(
    /// Eindeutige Kanal-ID (Text- und Voice-Kanaele)
    ChannelId,
    "channel"
);

id_typ!(
    /// Eindeutige Nachrichten-ID
    MessageId,
    "message"
);

id_typ!(
    /// Opake Verbindungs-ID, wird beim Transport-Connect vergeben
    ConnectionId,
    "conn"
);

/// Rolle eines Benutzers (vom Identity Provider geliefert)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    Admin,
    Moderator,
    User,
}

impl Rolle {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
        }
    }

    /// Admins und Moderatoren duerfen kicken und fremde Nachrichten loeschen
    pub fn darf_moderieren(&self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }
}

impl std::str::FromStr for Rolle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "user" => Ok(Self::User),
            other => Err(format!("Unbekannte Rolle: {other}")),
        }
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn ids_serialisieren_als_uuid_string() {
        let cid = ChannelId::new();
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{}\"", cid.inner()));
        let zurueck: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, cid);
    }

    #[test]
    fn id_aus_string_parsen() {
        let id = ConnectionId::new();
        let geparst: ConnectionId = id.inner().to_string().parse().unwrap();
        assert_eq!(geparst, id);
        assert!("kein-uuid".parse::<ConnectionId>().is_err());
    }

    #[test]
    fn rolle_moderationsrechte() {
        assert!(Rolle::Admin.darf_moderieren());
        assert!(Rolle::Moderator.darf_moderieren());
        assert!(!Rolle::User.darf_moderieren());
    }

    #[test]
    fn rolle_roundtrip_string() {
        for rolle in [Rolle::Admin, Rolle::Moderator, Rolle::User] {
            assert_eq!(rolle.als_str().parse::<Rolle>().unwrap(), rolle);
        }
        assert!("gott".parse::<Rolle>().is_err());
    }
}
