//! Voice-Presence – wer ist in welchem Voice-Kanal
//!
//! Der persistente Teilnehmer-Datensatz pro (Kanal, Benutzer) liegt im
//! Record Store. Zusaetzlich merkt sich der Manager, welche Verbindungen
//! einen Datensatz "tragen": erst wenn die letzte tragende Verbindung
//! getrennt wird, verschwindet der Teilnehmer.
//!
//! ## Nebenlaeufigkeit
//! Alle Check-then-Write-Sequenzen fuer ein (Kanal, Benutzer)-Paar laufen
//! unter einer Schluessel-Sperre ([`SchluesselSperren`]). Ein Beitritt prueft
//! nach dem Binden, ob seine Verbindung noch lebt, und rollt sonst zurueck.
//! Damit ist die Trennung immer der letzte Schreibzugriff.
//!
//! Schlaegt das Loeschen eines nicht mehr getragenen Datensatzes fehl, wird
//! er als verwaist vermerkt und vor dem naechsten Beitritt entfernt.

use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::{ChannelId, ConnectionId, UserId};
use treffpunkt_db::{
    BenutzerRecord, DbError, NeuerVoiceTeilnehmer, RecordStore, VoiceTeilnehmerRecord,
};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::VerbindungsRegistry;
use crate::sperren::SchluesselSperren;

/// Eine Teilnahme: (Kanal, Benutzer)
pub type Schluessel = (ChannelId, UserId);

/// Loeschversuche fuer nicht mehr getragene Datensaetze
const ENTFERNEN_VERSUCHE: u32 = 3;
const ENTFERNEN_PAUSE: Duration = Duration::from_millis(20);

/// Ergebnis eines Beitritts
#[derive(Debug, Clone)]
pub struct Beitritt {
    pub teilnehmer: VoiceTeilnehmerRecord,
    pub benutzer: BenutzerRecord,
    /// `false` wenn der Datensatz bereits existierte
    pub neu: bool,
}

pub struct VoicePresence<S, I> {
    store: Arc<S>,
    identity: Arc<I>,
    registry: VerbindungsRegistry,
    sperren: SchluesselSperren<Schluessel>,
    /// Teilnahme -> tragende Verbindungen
    bindungen: DashMap<Schluessel, HashSet<ConnectionId>>,
    /// Verbindung -> getragene Teilnahmen
    bindungen_von: DashMap<ConnectionId, HashSet<Schluessel>>,
    /// Datensaetze ohne tragende Verbindung, deren Loeschen fehlschlug
    verwaist: DashSet<Schluessel>,
}

impl<S, I> VoicePresence<S, I>
where
    S: RecordStore,
    I: IdentityProvider,
{
    pub fn neu(store: Arc<S>, identity: Arc<I>, registry: VerbindungsRegistry) -> Self {
        Self {
            store,
            identity,
            registry,
            sperren: SchluesselSperren::neu(),
            bindungen: DashMap::new(),
            bindungen_von: DashMap::new(),
            verwaist: DashSet::new(),
        }
    }

    /// Kanal und Benutzer laden; beide muessen existieren, der Kanal muss Voice sein
    async fn validieren(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> SignalingResult<BenutzerRecord> {
        match self.store.kanal_laden(channel_id).await? {
            Some(k) if k.ist_voice() => {}
            _ => {
                return Err(SignalingError::nicht_gefunden(format!(
                    "Voice-Kanal {channel_id}"
                )))
            }
        }
        self.store
            .benutzer_laden(user_id)
            .await?
            .ok_or_else(|| SignalingError::nicht_gefunden(format!("Benutzer {user_id}")))
    }

    /// Muss unter der Schluessel-Sperre aufgerufen werden
    async fn einfuegen(
        &self,
        channel_id: ChannelId,
        benutzer: BenutzerRecord,
    ) -> SignalingResult<Beitritt> {
        let schluessel = (channel_id, benutzer.id);
        if self.verwaist.contains(&schluessel) {
            self.store.teilnehmer_entfernen(channel_id, benutzer.id).await?;
            self.verwaist.remove(&schluessel);
            tracing::info!(
                channel_id = %channel_id,
                user_id = %benutzer.id,
                "Verwaiste Voice-Teilnahme vor Beitritt entfernt"
            );
        }

        let (teilnehmer, neu) = self
            .store
            .teilnehmer_einfuegen(NeuerVoiceTeilnehmer {
                channel_id,
                user_id: benutzer.id,
                username: &benutzer.username,
                avatar: benutzer.avatar.as_deref(),
            })
            .await?;
        Ok(Beitritt {
            teilnehmer,
            benutzer,
            neu,
        })
    }

    /// Tritt einem Voice-Kanal bei; idempotent
    pub async fn beitreten(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> SignalingResult<Beitritt> {
        let benutzer = self.validieren(channel_id, user_id).await?;
        let _sperre = self.sperren.sperren((channel_id, user_id)).await;
        self.einfuegen(channel_id, benutzer).await
    }

    /// Beitritt im Namen einer Verbindung
    ///
    /// Die Verbindung traegt danach den Datensatz. Wurde sie waehrend des
    /// Beitritts getrennt, wird alles zurueckgerollt und
    /// [`SignalingError::VerbindungGetrennt`] geliefert.
    pub async fn verbindung_beitreten(
        &self,
        connection_id: ConnectionId,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> SignalingResult<Beitritt> {
        let benutzer = self.validieren(channel_id, user_id).await?;
        let schluessel = (channel_id, user_id);
        let _sperre = self.sperren.sperren(schluessel).await;

        let beitritt = self.einfuegen(channel_id, benutzer).await?;

        self.bindungen
            .entry(schluessel)
            .or_default()
            .insert(connection_id);
        self.bindungen_von
            .entry(connection_id)
            .or_default()
            .insert(schluessel);

        if self.registry.ist_live(connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                channel_id = %channel_id,
                user_id = %user_id,
                neu = beitritt.neu,
                "Voice beigetreten"
            );
            return Ok(beitritt);
        }

        // Trennung lief parallel: eigene Spuren entfernen
        let ungetragen = self.binden_loesen(connection_id, schluessel);
        if beitritt.neu && ungetragen {
            // Der Beitritt scheitert in jedem Fall an der Trennung
            let _ = self.ungetragen_entfernen(schluessel).await;
        }
        tracing::debug!(
            connection_id = %connection_id,
            channel_id = %channel_id,
            "Voice-Beitritt zurueckgerollt, Verbindung getrennt"
        );
        Err(SignalingError::VerbindungGetrennt)
    }

    /// Loescht einen Datensatz, den keine Verbindung mehr traegt
    ///
    /// Wiederholt bei Store-Fehlern; scheitern alle Versuche, wird die
    /// Teilnahme als verwaist vermerkt. Muss unter der Schluessel-Sperre
    /// aufgerufen werden.
    async fn ungetragen_entfernen(&self, schluessel: Schluessel) -> Result<bool, DbError> {
        let (channel_id, user_id) = schluessel;
        let mut versuch = 1;
        loop {
            match self.store.teilnehmer_entfernen(channel_id, user_id).await {
                Ok(entfernt) => {
                    self.verwaist.remove(&schluessel);
                    return Ok(entfernt);
                }
                Err(e) if versuch < ENTFERNEN_VERSUCHE => {
                    tracing::warn!(
                        channel_id = %channel_id,
                        user_id = %user_id,
                        versuch,
                        fehler = %e,
                        "Voice-Teilnehmer entfernen fehlgeschlagen, neuer Versuch"
                    );
                    tokio::time::sleep(ENTFERNEN_PAUSE * versuch).await;
                    versuch += 1;
                }
                Err(e) => {
                    tracing::error!(
                        channel_id = %channel_id,
                        user_id = %user_id,
                        fehler = %e,
                        "Voice-Teilnehmer konnte nicht entfernt werden, als verwaist vermerkt"
                    );
                    self.verwaist.insert(schluessel);
                    return Err(e);
                }
            }
        }
    }

    /// Entfernt eine Bindung in beiden Richtungen
    ///
    /// `true` wenn die Teilnahme danach von keiner Verbindung mehr getragen wird.
    fn binden_loesen(&self, connection_id: ConnectionId, schluessel: Schluessel) -> bool {
        self.bindungen_von
            .remove_if_mut(&connection_id, |_, set| {
                set.remove(&schluessel);
                set.is_empty()
            });
        let mut leer = true;
        self.bindungen.remove_if_mut(&schluessel, |_, set| {
            set.remove(&connection_id);
            leer = set.is_empty();
            leer
        });
        leer
    }

    /// Verlaesst einen Voice-Kanal
    ///
    /// Entfernt den Datensatz unabhaengig davon, wie viele Verbindungen ihn
    /// tragen. `NichtGefunden` wenn der Benutzer kein Teilnehmer war.
    pub async fn verlassen(&self, channel_id: ChannelId, user_id: UserId) -> SignalingResult<()> {
        let schluessel = (channel_id, user_id);
        let _sperre = self.sperren.sperren(schluessel).await;

        if let Some((_, verbindungen)) = self.bindungen.remove(&schluessel) {
            for c in verbindungen {
                self.bindungen_von.remove_if_mut(&c, |_, set| {
                    set.remove(&schluessel);
                    set.is_empty()
                });
            }
        }

        let entfernt = self.store.teilnehmer_entfernen(channel_id, user_id).await?;
        self.verwaist.remove(&schluessel);
        if !entfernt {
            return Err(SignalingError::nicht_gefunden(format!(
                "Benutzer {user_id} ist nicht in Voice-Kanal {channel_id}"
            )));
        }
        tracing::debug!(channel_id = %channel_id, user_id = %user_id, "Voice verlassen");
        Ok(())
    }

    /// Teilnehmer in Beitrittsreihenfolge
    pub async fn teilnehmer(&self, channel_id: ChannelId) -> SignalingResult<Vec<VoiceTeilnehmerRecord>> {
        Ok(self.store.teilnehmer_auflisten(channel_id).await?)
    }

    /// Setzt das Stumm-Flag und liefert den aktualisierten Datensatz
    pub async fn stumm_setzen(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        muted: bool,
    ) -> SignalingResult<VoiceTeilnehmerRecord> {
        let _sperre = self.sperren.sperren((channel_id, user_id)).await;

        let nicht_drin = || {
            SignalingError::nicht_gefunden(format!(
                "Benutzer {user_id} ist nicht in Voice-Kanal {channel_id}"
            ))
        };
        if !self
            .store
            .teilnehmer_stumm_setzen(channel_id, user_id, muted)
            .await?
        {
            return Err(nicht_drin());
        }
        self.store
            .teilnehmer_laden(channel_id, user_id)
            .await?
            .ok_or_else(nicht_drin)
    }

    /// Entfernt `ziel` aus dem Kanal, nur fuer Admins und Moderatoren
    pub async fn kicken(
        &self,
        channel_id: ChannelId,
        ziel: UserId,
        akteur: UserId,
    ) -> SignalingResult<()> {
        let rolle = self
            .identity
            .rolle_laden(akteur)
            .await?
            .ok_or_else(|| SignalingError::nicht_gefunden(format!("Benutzer {akteur}")))?;
        if !rolle.darf_moderieren() {
            return Err(SignalingError::ZugriffVerweigert(
                "Nur Admins und Moderatoren duerfen aus Voice-Kanaelen entfernen".into(),
            ));
        }
        if self.identity.rolle_laden(ziel).await?.is_none() {
            return Err(SignalingError::nicht_gefunden(format!("Benutzer {ziel}")));
        }

        self.verlassen(channel_id, ziel).await?;
        tracing::info!(
            channel_id = %channel_id,
            ziel = %ziel,
            akteur = %akteur,
            "Benutzer aus Voice-Kanal entfernt"
        );
        Ok(())
    }

    /// Aufraeumen nach dem Trennen einer Verbindung
    ///
    /// Liefert die Teilnahmen, die dabei entfernt wurden (letzte tragende
    /// Verbindung). Fuer jede davon muss `user_left_voice` gesendet werden.
    pub async fn verbindung_getrennt(&self, connection_id: ConnectionId) -> Vec<Schluessel> {
        let getragen = match self.bindungen_von.remove(&connection_id) {
            Some((_, set)) => set,
            None => return Vec::new(),
        };

        let mut entfernt = Vec::new();
        for schluessel in getragen {
            let _sperre = self.sperren.sperren(schluessel).await;

            let mut war_gebunden = false;
            let mut leer = false;
            self.bindungen.remove_if_mut(&schluessel, |_, set| {
                war_gebunden = set.remove(&connection_id);
                leer = set.is_empty();
                leer
            });
            // Zwischenzeitlich per voice_leave entfernt
            if !war_gebunden || !leer {
                continue;
            }

            if let Ok(true) = self.ungetragen_entfernen(schluessel).await {
                entfernt.push(schluessel);
            }
        }

        if !entfernt.is_empty() {
            tracing::debug!(
                connection_id = %connection_id,
                anzahl = entfernt.len(),
                "Voice-Teilnahmen nach Trennung entfernt"
            );
        }
        entfernt
    }

    /// Anzahl der aktuell von Verbindungen getragenen Teilnahmen
    pub fn bindungs_anzahl(&self) -> usize {
        self.bindungen.len()
    }

    /// Datensaetze, deren Loeschen nach einer Trennung fehlschlug
    pub fn verwaiste_anzahl(&self) -> usize {
        self.verwaist.len()
    }

    /// Teilnahmen, die eine Verbindung traegt
    pub fn getragen_von(&self, connection_id: ConnectionId) -> Vec<Schluessel> {
        self.bindungen_von
            .get(&connection_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}
