//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Raeume, Router, Relay und Voice-Presence zusammen und
//! implementiert die Lebenszyklus-Operationen einer Verbindung
//! (Authentifizierung, Raum-Beitritt, Trennung mit Aufraeumkaskade).

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use treffpunkt_auth::{Identitaet, IdentityProvider};
use treffpunkt_chat::ChatService;
use treffpunkt_core::{ChannelId, ConnectionId, UserId};
use treffpunkt_db::RecordStore;
use treffpunkt_protocol::ereignisse::{namen, VoiceVerlassen};
use treffpunkt_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use treffpunkt_protocol::Frame;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{VerbindungsRegistry, STANDARD_QUEUE_GROESSE};
use crate::relay::SignalingRelay;
use crate::rooms::{RaumManager, RaumName};
use crate::router::EventRouter;
use crate::sperren::SchluesselSperren;
use crate::voice::VoicePresence;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Sende-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            send_queue_groesse: STANDARD_QUEUE_GROESSE,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Ergebnis einer Trennung
#[derive(Debug, Clone)]
pub struct Trennung {
    pub user_id: Option<UserId>,
    pub raeume: Vec<RaumName>,
    pub voice_verlassen: Vec<(ChannelId, UserId)>,
    /// Benutzer wurde offline gesetzt (keine weitere Verbindung)
    pub offline: bool,
    pub dauer: Duration,
}

/// Gemeinsamer Server-Zustand (Arc-geteilt)
pub struct SignalingState<S, I> {
    pub config: Arc<SignalingConfig>,
    pub store: Arc<S>,
    pub identity: Arc<I>,
    pub chat: Arc<ChatService<S>>,
    pub registry: VerbindungsRegistry,
    pub raeume: RaumManager,
    pub router: EventRouter,
    pub relay: SignalingRelay,
    pub voice: VoicePresence<S, I>,
    /// Serialisiert Presence-Schreibzugriffe pro Benutzer
    presence_sperren: SchluesselSperren<UserId>,
    pub start_time: Instant,
}

impl<S, I> SignalingState<S, I>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn neu(config: SignalingConfig, store: Arc<S>, identity: Arc<I>) -> Arc<Self> {
        let registry = VerbindungsRegistry::mit_queue_groesse(config.send_queue_groesse);
        let raeume = RaumManager::neu();
        let router = EventRouter::neu(registry.clone(), raeume.clone());
        let relay = SignalingRelay::neu(router.clone());
        let voice = VoicePresence::neu(Arc::clone(&store), Arc::clone(&identity), registry.clone());

        Arc::new(Self {
            config: Arc::new(config),
            chat: ChatService::neu(Arc::clone(&store)),
            store,
            identity,
            registry,
            raeume,
            router,
            relay,
            voice,
            presence_sperren: SchluesselSperren::neu(),
            start_time: Instant::now(),
        })
    }

    /// Registriert eine neue Transport-Verbindung
    pub fn verbindung_oeffnen(&self) -> (ConnectionId, mpsc::Receiver<Frame>) {
        let id = ConnectionId::new();
        let rx = self.registry.registrieren(id);
        (id, rx)
    }

    /// Prueft das Token und bindet die Identitaet an die Verbindung
    ///
    /// Erneutes Authentifizieren als derselbe Benutzer ist erlaubt, ein
    /// Wechsel des Benutzers auf einer Verbindung nicht.
    pub async fn authentifizieren(
        &self,
        connection_id: ConnectionId,
        token: &str,
    ) -> SignalingResult<Identitaet> {
        let identitaet = self.identity.token_pruefen(token).await?;
        let user_id = identitaet.user_id;

        let _sperre = self.presence_sperren.sperren(user_id).await;

        if let Some(bisher) = self.registry.benutzer_von(connection_id) {
            if bisher != user_id {
                return Err(SignalingError::Konflikt(
                    "Verbindung ist bereits einem anderen Benutzer zugeordnet".into(),
                ));
            }
        }
        if !self.registry.benutzer_binden(connection_id, user_id) {
            return Err(SignalingError::VerbindungGetrennt);
        }

        if let Err(e) = self.store.presence_setzen(user_id, true).await {
            tracing::warn!(user_id = %user_id, fehler = %e, "Presence konnte nicht gesetzt werden");
        }

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            username = %identitaet.username,
            "Verbindung authentifiziert"
        );
        Ok(identitaet)
    }

    /// Tritt einem Raum bei, nur solange die Verbindung lebt
    pub fn raum_beitreten(
        &self,
        connection_id: ConnectionId,
        raum: &RaumName,
    ) -> SignalingResult<bool> {
        if !self.registry.ist_live(connection_id) {
            return Err(SignalingError::VerbindungGetrennt);
        }
        let neu = self.raeume.beitreten(connection_id, raum);

        // Trennung zwischen Pruefung und Beitritt: Aufraeumen hat gewonnen
        if !self.registry.ist_live(connection_id) {
            self.raeume.verlassen(connection_id, raum);
            return Err(SignalingError::VerbindungGetrennt);
        }
        Ok(neu)
    }

    /// Trennt eine Verbindung und raeumt alles auf, was an ihr haengt
    ///
    /// Reihenfolge: Registry, Raeume, Voice-Teilnahmen (mit
    /// `user_left_voice`), Presence. Idempotent, nur der erste Aufruf
    /// liefert `Some`.
    pub async fn verbindung_trennen(&self, connection_id: ConnectionId) -> Option<Trennung> {
        let abgemeldet = self.registry.abmelden(connection_id)?;
        let raeume = self.raeume.alle_verlassen(connection_id);

        let voice_verlassen = self.voice.verbindung_getrennt(connection_id).await;
        for (channel_id, user_id) in &voice_verlassen {
            self.router.an_raum_senden(
                &RaumName::voice(*channel_id),
                namen::USER_LEFT_VOICE,
                VoiceVerlassen {
                    channel_id: *channel_id,
                    user_id: *user_id,
                },
            );
        }

        let mut offline = false;
        if let Some(user_id) = abgemeldet.user_id {
            let _sperre = self.presence_sperren.sperren(user_id).await;
            if self.registry.verbindungen_von_benutzer(user_id).is_empty() {
                match self.store.presence_setzen(user_id, false).await {
                    Ok(()) => offline = true,
                    Err(e) => tracing::warn!(
                        user_id = %user_id,
                        fehler = %e,
                        "Presence konnte nicht zurueckgesetzt werden"
                    ),
                }
            }
        }

        let dauer = abgemeldet.verbunden_seit.elapsed();
        tracing::info!(
            connection_id = %connection_id,
            user_id = ?abgemeldet.user_id,
            raeume = raeume.len(),
            voice = voice_verlassen.len(),
            dauer_sek = dauer.as_secs(),
            "Verbindung getrennt"
        );

        Some(Trennung {
            user_id: abgemeldet.user_id,
            raeume,
            voice_verlassen,
            offline,
            dauer,
        })
    }

    /// Laufzeit seit Serverstart in Sekunden
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
