//! treffpunkt-db – Record Store
//!
//! Repository-Traits fuer Benutzer, Kanaele, Voice-Teilnehmer und
//! Nachrichten samt SQLite-Implementierung (`SqliteDb`). Alle Traits sind
//! im Supertrait [`RecordStore`] zusammengefasst, den die hoeheren Schichten
//! als generischen Parameter verwenden.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use models::{
    BenutzerRecord, KanalRecord, KanalTyp, NachrichtRecord, NeueNachricht, NeuerBenutzer,
    NeuerKanal, NeuerVoiceTeilnehmer, ReaktionRecord, VoiceTeilnehmerRecord,
};
pub use repository::{
    ChannelRepository, DatabaseConfig, DbResult, MessageRepository, RecordStore, UserRepository,
    VoiceParticipantRepository,
};
pub use sqlite::SqliteDb;
