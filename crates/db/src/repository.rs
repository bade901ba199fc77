//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt Presence- und Chat-Logik von der
//! konkreten Datenbank. Methodennamen sind ueber alle Traits eindeutig, damit
//! ein `S: RecordStore` ohne voll qualifizierte Aufrufe auskommt.

use treffpunkt_core::{ChannelId, MessageId, UserId};

use crate::error::DbError;
use crate::models::{
    BenutzerRecord, KanalRecord, KanalTyp, NachrichtRecord, NeueNachricht, NeuerBenutzer,
    NeuerKanal, NeuerVoiceTeilnehmer, VoiceTeilnehmerRecord,
};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://treffpunkt.db")
    pub url: String,
    pub max_verbindungen: u32,
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://treffpunkt.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait UserRepository: Send + Sync {
    async fn benutzer_erstellen(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord>;
    async fn benutzer_laden(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;
    async fn benutzer_nach_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>>;

    /// Setzt `is_online` und `last_seen = jetzt`
    async fn presence_setzen(&self, id: UserId, online: bool) -> DbResult<()>;

    async fn online_benutzer(&self) -> DbResult<Vec<BenutzerRecord>>;

    /// Setzt alle Benutzer offline (Serverstart: es gibt noch keine Verbindungen)
    async fn alle_offline_setzen(&self) -> DbResult<u64>;
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

/// Kanaele die bei leerer Datenbank angelegt werden
const STANDARD_KANAELE: &[(&str, &str, KanalTyp)] = &[
    ("Allgemein", "Hauptchat fuer alle", KanalTyp::Text),
    ("PvP", "Diskussionen rund um PvP", KanalTyp::Text),
    ("Hilfe fuer Neulinge", "Fragen und Tipps fuer Einsteiger", KanalTyp::Text),
    ("Sprachkanal Allgemein", "Allgemeiner Voice-Kanal", KanalTyp::Voice),
    ("PvP Teams", "Voice-Kanal fuer PvP-Teams", KanalTyp::Voice),
];

#[allow(async_fn_in_trait)]
pub trait ChannelRepository: Send + Sync {
    async fn kanal_erstellen(&self, data: NeuerKanal<'_>) -> DbResult<KanalRecord>;
    async fn kanal_laden(&self, id: ChannelId) -> DbResult<Option<KanalRecord>>;
    async fn kanaele_auflisten(&self) -> DbResult<Vec<KanalRecord>>;
    async fn kanal_anzahl(&self) -> DbResult<i64>;
    async fn kanal_loeschen(&self, id: ChannelId) -> DbResult<bool>;

    /// Legt die Standard-Kanaele an, falls noch kein Kanal existiert
    ///
    /// Gibt die Anzahl der neu angelegten Kanaele zurueck.
    async fn standard_kanaele_anlegen(&self) -> DbResult<usize> {
        if self.kanal_anzahl().await? > 0 {
            return Ok(0);
        }
        for (name, beschreibung, typ) in STANDARD_KANAELE {
            self.kanal_erstellen(NeuerKanal {
                name: *name,
                description: Some(*beschreibung),
                channel_type: *typ,
                is_private: false,
                created_by: None,
            })
            .await?;
        }
        Ok(STANDARD_KANAELE.len())
    }
}

// ---------------------------------------------------------------------------
// Voice-Teilnehmer
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait VoiceParticipantRepository: Send + Sync {
    /// Fuegt einen Teilnehmer ein oder liefert den bestehenden Eintrag
    ///
    /// Das zweite Tupel-Element ist `true` wenn der Eintrag neu angelegt wurde.
    async fn teilnehmer_einfuegen(
        &self,
        data: NeuerVoiceTeilnehmer<'_>,
    ) -> DbResult<(VoiceTeilnehmerRecord, bool)>;

    async fn teilnehmer_laden(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> DbResult<Option<VoiceTeilnehmerRecord>>;

    async fn teilnehmer_entfernen(&self, channel_id: ChannelId, user_id: UserId) -> DbResult<bool>;

    /// Alle Teilnehmer eines Kanals in Beitrittsreihenfolge
    async fn teilnehmer_auflisten(&self, channel_id: ChannelId) -> DbResult<Vec<VoiceTeilnehmerRecord>>;

    async fn teilnehmer_stumm_setzen(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        muted: bool,
    ) -> DbResult<bool>;

    /// Entfernt alle Eintraege (verwaiste Teilnahmen nach Neustart)
    async fn teilnehmer_alle_entfernen(&self) -> DbResult<u64>;
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait MessageRepository: Send + Sync {
    async fn nachricht_erstellen(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;
    async fn nachricht_laden(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>>;
    async fn nachricht_loeschen(&self, id: MessageId) -> DbResult<bool>;

    /// Die neuesten `limit` Nachrichten eines Kanals, chronologisch sortiert
    async fn nachrichten_auflisten(
        &self,
        channel_id: ChannelId,
        limit: i64,
    ) -> DbResult<Vec<NachrichtRecord>>;

    /// Schaltet eine Reaktion um; `true` wenn sie danach gesetzt ist
    async fn reaktion_umschalten(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> DbResult<bool>;
}

/// Der vollstaendige Record Store
pub trait RecordStore:
    UserRepository + ChannelRepository + VoiceParticipantRepository + MessageRepository
{
}

impl<T> RecordStore for T where
    T: UserRepository + ChannelRepository + VoiceParticipantRepository + MessageRepository
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_standard() {
        let cfg = DatabaseConfig::default();
        assert!(cfg.sqlite_wal);
        assert_eq!(cfg.max_verbindungen, 5);
    }

    #[test]
    fn standard_kanaele_enthalten_voice() {
        let voice = STANDARD_KANAELE
            .iter()
            .filter(|(_, _, t)| *t == KanalTyp::Voice)
            .count();
        assert_eq!(voice, 2);
        assert_eq!(STANDARD_KANAELE.len(), 5);
    }
}
