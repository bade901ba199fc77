//! Raum-Handler – Kanal- und Voice-Raeume betreten/verlassen, Tipp-Anzeige

use serde_json::{json, Value};
use std::sync::Arc;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::{ChannelId, ConnectionId, UserId};
use treffpunkt_db::{KanalTyp, RecordStore};
use treffpunkt_protocol::ereignisse::{namen, Tippen};

use crate::error::{SignalingError, SignalingResult};
use crate::rooms::RaumName;
use crate::server_state::SignalingState;

async fn kanal_pruefen<S, I>(
    channel_id: ChannelId,
    typ: KanalTyp,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<()>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.store.kanal_laden(channel_id).await? {
        Some(k) if k.channel_type == typ => Ok(()),
        _ => Err(SignalingError::nicht_gefunden(format!(
            "{} {channel_id}",
            match typ {
                KanalTyp::Text => "Kanal",
                KanalTyp::Voice => "Voice-Kanal",
            }
        ))),
    }
}

/// `join_channel` und `join_voice_room`
pub async fn handle_raum_beitreten<S, I>(
    channel_id: ChannelId,
    typ: KanalTyp,
    connection_id: ConnectionId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    kanal_pruefen(channel_id, typ, state).await?;
    let raum = raum_fuer(channel_id, typ);
    state.raum_beitreten(connection_id, &raum)?;
    Ok(json!({ "room": raum.als_str() }))
}

/// `leave_channel` und `leave_voice_room`; kein Fehler wenn nicht Mitglied
pub fn handle_raum_verlassen<S, I>(
    channel_id: ChannelId,
    typ: KanalTyp,
    connection_id: ConnectionId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let raum = raum_fuer(channel_id, typ);
    let war_mitglied = state.raeume.verlassen(connection_id, &raum);
    Ok(json!({ "room": raum.als_str(), "was_member": war_mitglied }))
}

/// `typing_start` / `typing_stop` an den Kanal-Raum, ohne den Absender
pub fn handle_tippen<S, I>(
    channel_id: ChannelId,
    aktiv: bool,
    user_id: UserId,
    connection_id: ConnectionId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let event = if aktiv {
        namen::USER_TYPING
    } else {
        namen::USER_STOPPED_TYPING
    };
    state.router.an_raum_ausser_senden(
        &RaumName::kanal(channel_id),
        event,
        Tippen { user_id },
        connection_id,
    );
    Ok(json!({}))
}

fn raum_fuer(channel_id: ChannelId, typ: KanalTyp) -> RaumName {
    match typ {
        KanalTyp::Text => RaumName::kanal(channel_id),
        KanalTyp::Voice => RaumName::voice(channel_id),
    }
}
