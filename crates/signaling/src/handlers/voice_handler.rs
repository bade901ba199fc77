//! Voice-Handler – Beitritt, Verlassen, Teilnehmerliste, Stumm, Kick
//!
//! Zustandsaenderungen werden an den Signalisierungs-Raum `voice_<id>`
//! gemeldet. `user_joined_voice` geht bei jedem erfolgreichen Beitritt raus,
//! auch wenn der Teilnehmer schon eingetragen war.

use serde_json::{json, Value};
use std::sync::Arc;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::{ChannelId, ConnectionId, UserId};
use treffpunkt_db::{BenutzerRecord, RecordStore, VoiceTeilnehmerRecord};
use treffpunkt_protocol::ereignisse::{
    namen, BenutzerInfo, StummGeaendert, TeilnehmerInfo, VoiceBeigetreten, VoiceVerlassen,
};

use crate::error::SignalingResult;
use crate::rooms::RaumName;
use crate::server_state::SignalingState;

pub(crate) fn benutzer_info(b: &BenutzerRecord) -> BenutzerInfo {
    BenutzerInfo {
        id: b.id,
        username: b.username.clone(),
        avatar: b.avatar.clone(),
        role: b.role.als_str().to_string(),
        is_online: b.is_online,
    }
}

pub(crate) fn teilnehmer_info(t: &VoiceTeilnehmerRecord) -> TeilnehmerInfo {
    TeilnehmerInfo {
        user_id: t.user_id,
        username: t.username.clone(),
        avatar: t.avatar.clone(),
        is_muted: t.is_muted,
        joined_at: t.joined_at,
    }
}

/// `voice_join`: Teilnahme an einem Voice-Kanal
///
/// Traegt den Benutzer ein (idempotent), bindet die Teilnahme an die
/// Verbindung und nimmt sie in `voice_<id>` auf. `user_joined_voice` geht an
/// den ganzen Raum, der Beitretende eingeschlossen. `new` in der Antwort
/// sagt, ob der Datensatz neu angelegt wurde.
pub async fn handle_voice_join<S, I>(
    channel_id: ChannelId,
    user_id: UserId,
    connection_id: ConnectionId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let beitritt = state
        .voice
        .verbindung_beitreten(connection_id, channel_id, user_id)
        .await?;

    // Raum erst nach erfolgreichem Beitritt, damit der Beitretende den Push sieht
    let raum = RaumName::voice(channel_id);
    state.raum_beitreten(connection_id, &raum)?;

    state.router.an_raum_senden(
        &raum,
        namen::USER_JOINED_VOICE,
        VoiceBeigetreten {
            channel_id,
            user: benutzer_info(&beitritt.benutzer),
        },
    );

    Ok(json!({
        "participant": teilnehmer_info(&beitritt.teilnehmer),
        "new": beitritt.neu,
    }))
}

/// `voice_leave`: Teilnahme beenden und `user_left_voice` melden
///
/// `NOT_FOUND` ohne Teilnahme; dann wird nichts gesendet.
pub async fn handle_voice_leave<S, I>(
    channel_id: ChannelId,
    user_id: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    state.voice.verlassen(channel_id, user_id).await?;
    state.router.an_raum_senden(
        &RaumName::voice(channel_id),
        namen::USER_LEFT_VOICE,
        VoiceVerlassen {
            channel_id,
            user_id,
        },
    );
    Ok(json!({}))
}

/// `voice_participants`: Teilnehmer in Beitrittsreihenfolge
pub async fn handle_voice_participants<S, I>(
    channel_id: ChannelId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let teilnehmer: Vec<TeilnehmerInfo> = state
        .voice
        .teilnehmer(channel_id)
        .await?
        .iter()
        .map(teilnehmer_info)
        .collect();
    Ok(json!({ "channel_id": channel_id, "participants": teilnehmer }))
}

/// `voice_mute`: eigenes Stumm-Flag setzen, Raum erhaelt `user_mute_changed`
pub async fn handle_voice_mute<S, I>(
    channel_id: ChannelId,
    muted: bool,
    user_id: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let teilnehmer = state.voice.stumm_setzen(channel_id, user_id, muted).await?;
    state.router.an_raum_senden(
        &RaumName::voice(channel_id),
        namen::USER_MUTE_CHANGED,
        StummGeaendert {
            channel_id,
            user_id,
            is_muted: teilnehmer.is_muted,
        },
    );
    Ok(json!({ "participant": teilnehmer_info(&teilnehmer) }))
}

/// `voice_kick`: Moderatoren und Admins entfernen `ziel` aus dem Kanal
///
/// Fuer den Raum sieht ein Kick aus wie ein normales Verlassen.
pub async fn handle_voice_kick<S, I>(
    channel_id: ChannelId,
    ziel: UserId,
    akteur: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    state.voice.kicken(channel_id, ziel, akteur).await?;
    state.router.an_raum_senden(
        &RaumName::voice(channel_id),
        namen::USER_LEFT_VOICE,
        VoiceVerlassen {
            channel_id,
            user_id: ziel,
        },
    );
    Ok(json!({}))
}
