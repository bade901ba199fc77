//! Event-Router – Fanout an Raeume, einzelne Verbindungen oder alle
//!
//! Die Empfaengerliste wird als Snapshot gezogen; danach wird ohne Sperre
//! in die Queues eingestellt. Rueckgabewert ist jeweils die Anzahl der
//! Verbindungen, fuer die ein Frame eingestellt wurde.

use serde::Serialize;
use serde_json::Value;
use treffpunkt_core::ConnectionId;
use treffpunkt_protocol::Frame;

use crate::registry::VerbindungsRegistry;
use crate::rooms::{RaumManager, RaumName};

#[derive(Clone)]
pub struct EventRouter {
    registry: VerbindungsRegistry,
    raeume: RaumManager,
}

impl EventRouter {
    pub fn neu(registry: VerbindungsRegistry, raeume: RaumManager) -> Self {
        Self { registry, raeume }
    }

    /// An alle Mitglieder eines Raums
    pub fn an_raum_senden(&self, raum: &RaumName, event: &str, payload: impl Serialize) -> usize {
        self.an_raum(raum, event, payload, None)
    }

    /// An alle Mitglieder eines Raums ausser `ausgenommen`
    pub fn an_raum_ausser_senden(
        &self,
        raum: &RaumName,
        event: &str,
        payload: impl Serialize,
        ausgenommen: ConnectionId,
    ) -> usize {
        self.an_raum(raum, event, payload, Some(ausgenommen))
    }

    pub fn an_verbindung_senden(
        &self,
        connection_id: ConnectionId,
        event: &str,
        payload: impl Serialize,
    ) -> bool {
        match serialisieren(event, payload) {
            Some(data) => self.registry.senden(connection_id, Frame::push(event, data)),
            None => false,
        }
    }

    /// An alle Live-Verbindungen
    pub fn an_alle_senden(&self, event: &str, payload: impl Serialize) -> usize {
        let Some(data) = serialisieren(event, payload) else {
            return 0;
        };
        self.verteilen(self.registry.alle(), event, data)
    }

    fn an_raum(
        &self,
        raum: &RaumName,
        event: &str,
        payload: impl Serialize,
        ausgenommen: Option<ConnectionId>,
    ) -> usize {
        let Some(data) = serialisieren(event, payload) else {
            return 0;
        };
        let empfaenger: Vec<ConnectionId> = self
            .raeume
            .mitglieder(raum)
            .into_iter()
            .filter(|c| Some(*c) != ausgenommen)
            .collect();
        let zugestellt = self.verteilen(empfaenger, event, data);
        tracing::trace!(raum = %raum, event = %event, zugestellt, "Raum-Fanout");
        zugestellt
    }

    fn verteilen(&self, empfaenger: Vec<ConnectionId>, event: &str, data: Value) -> usize {
        empfaenger
            .into_iter()
            .filter(|c| self.registry.senden(*c, Frame::push(event, data.clone())))
            .count()
    }
}

fn serialisieren(event: &str, payload: impl Serialize) -> Option<Value> {
    match serde_json::to_value(payload) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::error!(event = %event, fehler = %e, "Payload nicht serialisierbar");
            None
        }
    }
}
