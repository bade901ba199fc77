//! Raum-Verwaltung – benannte Gruppen von Verbindungen
//!
//! Raeume sind reine In-Memory-Gruppen fuer das Fanout. Ein leerer Raum wird
//! entfernt. Beide Richtungen (Raum -> Mitglieder, Verbindung -> Raeume)
//! liegen hinter einer gemeinsamen Sperre und sind damit immer konsistent.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use treffpunkt_core::{ChannelId, ConnectionId};

/// Name eines Raums
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaumName(String);

impl RaumName {
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Raum eines Text-Kanals (`channel_<id>`)
    pub fn kanal(channel_id: ChannelId) -> Self {
        Self(format!("channel_{}", channel_id.inner()))
    }

    /// Signalisierungs-Raum eines Voice-Kanals (`voice_<id>`)
    pub fn voice(channel_id: ChannelId) -> Self {
        Self(format!("voice_{}", channel_id.inner()))
    }

    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaumName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct RaumTabellen {
    mitglieder: HashMap<RaumName, HashSet<ConnectionId>>,
    raeume_von: HashMap<ConnectionId, HashSet<RaumName>>,
}

#[derive(Clone, Default)]
pub struct RaumManager {
    inner: Arc<RwLock<RaumTabellen>>,
}

impl RaumManager {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt die Verbindung dem Raum hinzu; `false` wenn sie schon Mitglied war
    pub fn beitreten(&self, connection_id: ConnectionId, raum: &RaumName) -> bool {
        let mut t = self.inner.write();
        let neu = t
            .mitglieder
            .entry(raum.clone())
            .or_default()
            .insert(connection_id);
        t.raeume_von
            .entry(connection_id)
            .or_default()
            .insert(raum.clone());
        if neu {
            tracing::trace!(connection_id = %connection_id, raum = %raum, "Raum beigetreten");
        }
        neu
    }

    /// Entfernt die Verbindung aus dem Raum; `false` wenn sie kein Mitglied war
    pub fn verlassen(&self, connection_id: ConnectionId, raum: &RaumName) -> bool {
        let mut t = self.inner.write();
        let entfernt = match t.mitglieder.get_mut(raum) {
            Some(set) => {
                let entfernt = set.remove(&connection_id);
                if set.is_empty() {
                    t.mitglieder.remove(raum);
                }
                entfernt
            }
            None => false,
        };
        if let Some(set) = t.raeume_von.get_mut(&connection_id) {
            set.remove(raum);
            if set.is_empty() {
                t.raeume_von.remove(&connection_id);
            }
        }
        entfernt
    }

    /// Entfernt die Verbindung aus allen Raeumen und liefert diese zurueck
    pub fn alle_verlassen(&self, connection_id: ConnectionId) -> Vec<RaumName> {
        let mut t = self.inner.write();
        let raeume: Vec<RaumName> = t
            .raeume_von
            .remove(&connection_id)
            .map(|s| s.into_iter().collect())
            .unwrap_or_default();

        for raum in &raeume {
            if let Some(set) = t.mitglieder.get_mut(raum) {
                set.remove(&connection_id);
                if set.is_empty() {
                    t.mitglieder.remove(raum);
                }
            }
        }
        raeume
    }

    /// Snapshot der Mitglieder eines Raums
    pub fn mitglieder(&self, raum: &RaumName) -> Vec<ConnectionId> {
        self.inner
            .read()
            .mitglieder
            .get(raum)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot der Raeume einer Verbindung
    ///
    /// Leer fuer unbekannte Verbindungen.
    pub fn raeume_von(&self, connection_id: ConnectionId) -> Vec<RaumName> {
        self.inner
            .read()
            .raeume_von
            .get(&connection_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `true` wenn die Verbindung gerade im Raum ist
    pub fn ist_mitglied(&self, connection_id: ConnectionId, raum: &RaumName) -> bool {
        self.inner
            .read()
            .mitglieder
            .get(raum)
            .is_some_and(|s| s.contains(&connection_id))
    }

    /// Anzahl nicht-leerer Raeume
    pub fn raum_anzahl(&self) -> usize {
        self.inner.read().mitglieder.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raum_namen() {
        let id = ChannelId::new();
        assert_eq!(RaumName::kanal(id).als_str(), format!("channel_{}", id.inner()));
        assert_eq!(RaumName::voice(id).to_string(), format!("voice_{}", id.inner()));
    }

    #[test]
    fn beitreten_ist_idempotent() {
        let rm = RaumManager::neu();
        let c = ConnectionId::new();
        let raum = RaumName::neu("lobby");

        assert!(rm.beitreten(c, &raum));
        assert!(!rm.beitreten(c, &raum));
        assert_eq!(rm.mitglieder(&raum), vec![c]);
    }

    #[test]
    fn leerer_raum_wird_entfernt() {
        let rm = RaumManager::neu();
        let c = ConnectionId::new();
        let raum = RaumName::neu("lobby");

        rm.beitreten(c, &raum);
        assert_eq!(rm.raum_anzahl(), 1);
        assert!(rm.verlassen(c, &raum));
        assert!(!rm.verlassen(c, &raum));
        assert_eq!(rm.raum_anzahl(), 0);
        assert!(rm.raeume_von(c).is_empty());
    }

    #[test]
    fn alle_verlassen_liefert_raeume() {
        let rm = RaumManager::neu();
        let x = ConnectionId::new();
        let y = ConnectionId::new();
        let a = RaumName::neu("a");
        let b = RaumName::neu("b");

        rm.beitreten(x, &a);
        rm.beitreten(x, &b);
        rm.beitreten(y, &a);

        let mut verlassen = rm.alle_verlassen(x);
        verlassen.sort();
        assert_eq!(verlassen, vec![a.clone(), b.clone()]);

        assert_eq!(rm.mitglieder(&a), vec![y]);
        assert!(rm.mitglieder(&b).is_empty());
        assert!(!rm.ist_mitglied(x, &a));
        assert!(rm.alle_verlassen(x).is_empty());
    }
}
