//! Message-Dispatcher – Routet eingehende Frames an die richtigen Handler
//!
//! Der Dispatcher parst den Frame zu einem [`ClientEreignis`], prueft ob die
//! Verbindung authentifiziert sein muss und uebersetzt das Handler-Ergebnis
//! in eine `ok`- oder `error`-Antwort mit derselben `request_id`.
//!
//! Frames mit `request_id == 0` erwarten keine Antwort (fire-and-forget);
//! Fehler werden dann nur geloggt.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::{ConnectionId, UserId};
use treffpunkt_db::{KanalTyp, RecordStore};
use treffpunkt_protocol::ereignisse::{namen, ClientEreignis};
use treffpunkt_protocol::{ErrorCode, Frame};

use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{auth_handler, chat_handler, raum_handler, voice_handler, webrtc_handler};
use crate::relay::SignalArt;
use crate::server_state::SignalingState;

/// Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    pub connection_id: ConnectionId,
    pub peer_addr: Option<SocketAddr>,
    /// Gebundene Identitaet (None bis `authenticate`)
    pub user_id: Option<UserId>,
}

impl DispatcherContext {
    pub fn neu(connection_id: ConnectionId, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            connection_id,
            peer_addr,
            user_id: None,
        }
    }
}

pub struct MessageDispatcher<S, I> {
    state: Arc<SignalingState<S, I>>,
}

impl<S, I> MessageDispatcher<S, I>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn neu(state: Arc<SignalingState<S, I>>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen Frame und gibt die Antwort zurueck
    ///
    /// `None` wenn keine Antwort gesendet werden soll.
    pub async fn dispatch(&self, frame: Frame, ctx: &mut DispatcherContext) -> Option<Frame> {
        let request_id = frame.request_id;

        let ereignis = match ClientEreignis::aus_frame(&frame) {
            Ok(e) => e,
            Err(e) => return antwort(request_id, &frame.event, Err(e.into())),
        };

        if !ereignis.braucht_authentifizierung() {
            return self.dispatch_offen(ereignis, request_id, &frame.event, ctx).await;
        }

        let Some(user_id) = ctx.user_id else {
            return antwort(
                request_id,
                &frame.event,
                Err(SignalingError::NichtAuthentifiziert),
            );
        };

        let ergebnis = self.dispatch_authentifiziert(ereignis, user_id, ctx).await;
        antwort(request_id, &frame.event, ergebnis)
    }

    /// Ereignisse ohne gebundene Identitaet: authenticate, ping, pong
    async fn dispatch_offen(
        &self,
        ereignis: ClientEreignis,
        request_id: u32,
        event: &str,
        ctx: &mut DispatcherContext,
    ) -> Option<Frame> {
        match ereignis {
            ClientEreignis::Ping { timestamp_ms } => Some(Frame::neu(
                request_id,
                namen::PONG,
                json!({
                    "timestamp_ms": timestamp_ms,
                    "server_timestamp_ms": jetzt_ms(),
                }),
            )),
            ClientEreignis::Pong { .. } => {
                tracing::trace!(connection_id = %ctx.connection_id, "Pong empfangen");
                None
            }
            ClientEreignis::Authenticate { token } => {
                let ergebnis =
                    auth_handler::handle_authenticate(&token, ctx.connection_id, &self.state).await;
                if ergebnis.is_ok() {
                    ctx.user_id = self.state.registry.benutzer_von(ctx.connection_id);
                }
                antwort(request_id, event, ergebnis)
            }
            andere => antwort(request_id, event, Err(falsch_eingeordnet(&andere))),
        }
    }

    async fn dispatch_authentifiziert(
        &self,
        ereignis: ClientEreignis,
        user_id: UserId,
        ctx: &DispatcherContext,
    ) -> SignalingResult<Value> {
        let conn = ctx.connection_id;
        let state = &self.state;

        match ereignis {
            // -------------------------------------------------------------------
            // Raeume
            // -------------------------------------------------------------------
            ClientEreignis::JoinChannel { channel_id } => {
                raum_handler::handle_raum_beitreten(channel_id, KanalTyp::Text, conn, state).await
            }
            ClientEreignis::LeaveChannel { channel_id } => {
                raum_handler::handle_raum_verlassen(channel_id, KanalTyp::Text, conn, state)
            }
            ClientEreignis::JoinVoiceRoom { channel_id } => {
                raum_handler::handle_raum_beitreten(channel_id, KanalTyp::Voice, conn, state).await
            }
            ClientEreignis::LeaveVoiceRoom { channel_id } => {
                raum_handler::handle_raum_verlassen(channel_id, KanalTyp::Voice, conn, state)
            }
            ClientEreignis::TypingStart { channel_id } => {
                raum_handler::handle_tippen(channel_id, true, user_id, conn, state)
            }
            ClientEreignis::TypingStop { channel_id } => {
                raum_handler::handle_tippen(channel_id, false, user_id, conn, state)
            }

            // -------------------------------------------------------------------
            // WebRTC
            // -------------------------------------------------------------------
            ClientEreignis::WebrtcOffer { target, offer } => {
                webrtc_handler::handle_signal(SignalArt::Offer, conn, target, offer, state)
            }
            ClientEreignis::WebrtcAnswer { target, answer } => {
                webrtc_handler::handle_signal(SignalArt::Answer, conn, target, answer, state)
            }
            ClientEreignis::WebrtcIceCandidate { target, candidate } => {
                webrtc_handler::handle_signal(SignalArt::IceCandidate, conn, target, candidate, state)
            }

            // -------------------------------------------------------------------
            // Voice
            // -------------------------------------------------------------------
            ClientEreignis::VoiceJoin { channel_id } => {
                voice_handler::handle_voice_join(channel_id, user_id, conn, state).await
            }
            ClientEreignis::VoiceLeave { channel_id } => {
                voice_handler::handle_voice_leave(channel_id, user_id, state).await
            }
            ClientEreignis::VoiceParticipants { channel_id } => {
                voice_handler::handle_voice_participants(channel_id, state).await
            }
            ClientEreignis::VoiceMute { channel_id, muted } => {
                voice_handler::handle_voice_mute(channel_id, muted, user_id, state).await
            }
            ClientEreignis::VoiceKick {
                channel_id,
                user_id: ziel,
            } => voice_handler::handle_voice_kick(channel_id, ziel, user_id, state).await,

            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientEreignis::SendMessage {
                channel_id,
                content,
            } => chat_handler::handle_send_message(channel_id, &content, user_id, state).await,
            ClientEreignis::DeleteMessage { message_id } => {
                chat_handler::handle_delete_message(message_id, user_id, state).await
            }
            ClientEreignis::AddReaction { message_id, emoji } => {
                chat_handler::handle_add_reaction(message_id, &emoji, user_id, state).await
            }

            andere => Err(falsch_eingeordnet(&andere)),
        }
    }
}

/// Ereignis landete im falschen Zweig von `braucht_authentifizierung`
fn falsch_eingeordnet(ereignis: &ClientEreignis) -> SignalingError {
    SignalingError::intern(format!(
        "Ereignis falsch eingeordnet (Authentifizierung noetig: {})",
        ereignis.braucht_authentifizierung()
    ))
}

/// Baut die Antwort auf einen Request
fn antwort(request_id: u32, event: &str, ergebnis: SignalingResult<Value>) -> Option<Frame> {
    match ergebnis {
        Ok(data) => (request_id != 0).then(|| Frame::ok(request_id, data)),
        Err(e) => {
            let code = e.error_code();
            if code == ErrorCode::InternalError {
                tracing::error!(event = %event, fehler = %e, "Interner Fehler bei Verarbeitung");
            } else {
                tracing::debug!(event = %event, fehler = %e, "Anfrage abgelehnt");
            }
            (request_id != 0).then(|| Frame::fehler(request_id, code, e.client_meldung()))
        }
    }
}

fn jetzt_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
