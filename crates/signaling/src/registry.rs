//! Verbindungsregistry – Live-Verbindungen und ihre Sende-Queues
//!
//! Jede Verbindung bekommt beim Registrieren eine begrenzte mpsc-Queue. Der
//! Verbindungs-Task liest die Queue und schreibt auf den Socket; alle anderen
//! Komponenten senden nur ueber [`VerbindungsRegistry::senden`] und blockieren
//! dabei nie. Ist eine Queue voll, wird das Ereignis fuer diesen Empfaenger
//! verworfen.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use treffpunkt_core::{ConnectionId, UserId};
use treffpunkt_protocol::Frame;

/// Standardgroesse der Sende-Queue pro Verbindung
pub const STANDARD_QUEUE_GROESSE: usize = 64;

struct VerbindungsEintrag {
    sender: mpsc::Sender<Frame>,
    user_id: Option<UserId>,
    verbunden_seit: Instant,
}

/// Ergebnis von [`VerbindungsRegistry::abmelden`]
#[derive(Debug, Clone, Copy)]
pub struct Abgemeldet {
    pub user_id: Option<UserId>,
    pub verbunden_seit: Instant,
}

struct RegistryInner {
    verbindungen: DashMap<ConnectionId, VerbindungsEintrag>,
    queue_groesse: usize,
    verworfen: AtomicU64,
}

/// Thread-sichere Registry aller Live-Verbindungen
#[derive(Clone)]
pub struct VerbindungsRegistry {
    inner: Arc<RegistryInner>,
}

impl VerbindungsRegistry {
    pub fn neu() -> Self {
        Self::mit_queue_groesse(STANDARD_QUEUE_GROESSE)
    }

    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                verbindungen: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
                verworfen: AtomicU64::new(0),
            }),
        }
    }

    /// Registriert eine neue Verbindung und gibt das Empfangsende der Queue zurueck
    ///
    /// Eine erneute Registrierung derselben ID ersetzt die alte Queue.
    pub fn registrieren(&self, connection_id: ConnectionId) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner.verbindungen.insert(
            connection_id,
            VerbindungsEintrag {
                sender: tx,
                user_id: None,
                verbunden_seit: Instant::now(),
            },
        );
        tracing::debug!(connection_id = %connection_id, "Verbindung registriert");
        rx
    }

    /// Bindet eine Identitaet an die Verbindung; `false` wenn sie nicht mehr lebt
    pub fn benutzer_binden(&self, connection_id: ConnectionId, user_id: UserId) -> bool {
        match self.inner.verbindungen.get_mut(&connection_id) {
            Some(mut eintrag) => {
                eintrag.user_id = Some(user_id);
                true
            }
            None => false,
        }
    }

    /// Entfernt die Verbindung; idempotent
    ///
    /// Nur der erste Aufruf liefert `Some`. Damit laeuft die Aufraeumkaskade
    /// genau einmal pro Verbindung.
    pub fn abmelden(&self, connection_id: ConnectionId) -> Option<Abgemeldet> {
        let (_, eintrag) = self.inner.verbindungen.remove(&connection_id)?;
        tracing::debug!(connection_id = %connection_id, "Verbindung abgemeldet");
        Some(Abgemeldet {
            user_id: eintrag.user_id,
            verbunden_seit: eintrag.verbunden_seit,
        })
    }

    /// `true` solange die Verbindung registriert ist
    ///
    /// Nach `abmelden` dauerhaft `false`; Beitritte pruefen damit, ob sie
    /// zurueckrollen muessen.
    pub fn ist_live(&self, connection_id: ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(&connection_id)
    }

    /// Gebundener Benutzer, `None` vor `authenticate` oder nach der Trennung
    pub fn benutzer_von(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.inner
            .verbindungen
            .get(&connection_id)
            .and_then(|e| e.user_id)
    }

    /// Alle Live-Verbindungen eines Benutzers
    pub fn verbindungen_von_benutzer(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.inner
            .verbindungen
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .map(|e| *e.key())
            .collect()
    }

    /// Stellt einen Frame in die Queue der Verbindung ein, ohne zu warten
    ///
    /// `false` wenn die Verbindung unbekannt ist oder der Frame verworfen wurde.
    pub fn senden(&self, connection_id: ConnectionId, frame: Frame) -> bool {
        // Sender klonen, damit keine Shard-Sperre waehrend try_send gehalten wird
        let sender = match self.inner.verbindungen.get(&connection_id) {
            Some(e) => e.sender.clone(),
            None => return false,
        };

        match sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                self.inner.verworfen.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    connection_id = %connection_id,
                    event = %frame.event,
                    "Sende-Queue voll, Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Sende-Queue geschlossen"
                );
                false
            }
        }
    }

    /// Snapshot aller Live-Verbindungs-IDs
    pub fn alle(&self) -> Vec<ConnectionId> {
        self.inner.verbindungen.iter().map(|e| *e.key()).collect()
    }

    /// Anzahl der Live-Verbindungen (authentifiziert oder nicht)
    pub fn anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Wegen voller Queue verworfene Frames seit Start
    pub fn verworfene_anzahl(&self) -> u64 {
        self.inner.verworfen.load(Ordering::Relaxed)
    }

    /// Live-Verbindungen mit gebundenem Benutzer
    pub fn authentifizierte_anzahl(&self) -> usize {
        self.inner
            .verbindungen
            .iter()
            .filter(|e| e.user_id.is_some())
            .count()
    }
}

impl Default for VerbindungsRegistry {
    fn default() -> Self {
        Self::neu()
    }
}
