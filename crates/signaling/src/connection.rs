//! Client-Connection – Verwaltet eine einzelne Transport-Verbindung
//!
//! Jede Verbindung laeuft als eigener lokaler Task. Die Schleife liest
//! Frames via [`FrameCodec`], dispatcht sie an den [`MessageDispatcher`] und
//! schreibt die Antworten sowie alle Pushes aus der Sende-Queue der
//! Verbindung zurueck auf den Stream.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen `ping`-Push
//! - Jeder empfangene Frame zaehlt als Lebenszeichen
//! - Nach `verbindungs_timeout_sek` ohne Frame wird getrennt
//!
//! Beim Verlassen der Schleife laeuft immer die Aufraeumkaskade
//! ([`SignalingState::verbindung_trennen`]).

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::Framed;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_db::RecordStore;
use treffpunkt_protocol::ereignisse::{namen, Keepalive};
use treffpunkt_protocol::{ErrorCode, Frame, FrameCodec};

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

pub struct ClientConnection<S, I> {
    state: Arc<SignalingState<S, I>>,
    peer_addr: Option<SocketAddr>,
}

impl<S, I> ClientConnection<S, I>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn neu(state: Arc<SignalingState<S, I>>, peer_addr: Option<SocketAddr>) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Timeout greift oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten<T>(self, stream: T, mut shutdown_rx: watch::Receiver<bool>)
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        let (connection_id, mut sende_rx) = self.state.verbindung_oeffnen();
        let peer = self
            .peer_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "lokal".into());
        tracing::info!(connection_id = %connection_id, peer = %peer, "Neue Verbindung");

        let codec = FrameCodec::with_max_size(self.state.config.max_frame_groesse);
        let mut framed = Framed::new(stream, codec);

        let mut ctx = DispatcherContext::neu(connection_id, self.peer_addr);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(connection_id = %connection_id, "Verbindungs-Timeout");
                break;
            }
            let ping_verzoegerung = naechster_ping.saturating_duration_since(jetzt);

            tokio::select! {
                frame = framed.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                connection_id = %connection_id,
                                request_id = frame.request_id,
                                event = %frame.event,
                                "Frame empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(frame, &mut ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        connection_id = %connection_id,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(connection_id = %connection_id, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Pushes aus der Sende-Queue (Raum-Fanout, Relay)
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            connection_id = %connection_id,
                            fehler = %e,
                            "Push-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        let ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                        let data = serde_json::to_value(Keepalive { timestamp_ms: ts })
                            .unwrap_or_default();
                        let ping = Frame::push(namen::PING, data);
                        if let Err(e) = framed.send(ping).await {
                            tracing::warn!(
                                connection_id = %connection_id,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(connection_id = %connection_id, "Shutdown-Signal, Verbindung wird getrennt");
                        let abschied = Frame::fehler(
                            0,
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        self.state.verbindung_trennen(connection_id).await;
        tracing::debug!(connection_id = %connection_id, "Verbindungs-Task beendet");
    }
}
