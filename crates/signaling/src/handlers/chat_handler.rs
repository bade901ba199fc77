//! Chat-Handler – Nachrichten senden, loeschen, Reaktionen
//!
//! Persistenz und Berechtigungen liegen im ChatService; hier wird nur
//! verteilt. Neue Nachrichten gehen an den Kanal-Raum, Loeschungen und
//! Reaktionen an alle Verbindungen.

use serde_json::{json, Value};
use std::sync::Arc;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::{ChannelId, MessageId, UserId};
use treffpunkt_db::RecordStore;
use treffpunkt_protocol::ereignisse::{namen, NachrichtGeloescht, ReaktionHinzugefuegt};

use crate::error::{SignalingError, SignalingResult};
use crate::rooms::RaumName;
use crate::server_state::SignalingState;

/// `send_message`: speichern, dann `new_message` an `channel_<id>`
pub async fn handle_send_message<S, I>(
    channel_id: ChannelId,
    content: &str,
    user_id: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let nachricht = state
        .chat
        .nachricht_senden(channel_id, user_id, content)
        .await?;

    state
        .router
        .an_raum_senden(&RaumName::kanal(channel_id), namen::NEW_MESSAGE, &nachricht);

    Ok(json!({ "message": nachricht }))
}

/// `delete_message`: Verfasser oder Moderator; `message_deleted` an alle
pub async fn handle_delete_message<S, I>(
    message_id: MessageId,
    user_id: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    // Rolle zum Zeitpunkt der Aktion, nicht zum Zeitpunkt des Logins
    let rolle = state
        .identity
        .rolle_laden(user_id)
        .await?
        .ok_or_else(|| SignalingError::nicht_gefunden(format!("Benutzer {user_id}")))?;

    state
        .chat
        .nachricht_loeschen(message_id, user_id, rolle)
        .await?;

    state
        .router
        .an_alle_senden(namen::MESSAGE_DELETED, NachrichtGeloescht { message_id });

    Ok(json!({}))
}

/// `add_reaction`: Reaktion umschalten, `reaction_added` an alle
pub async fn handle_add_reaction<S, I>(
    message_id: MessageId,
    emoji: &str,
    user_id: UserId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let aktiv = state
        .chat
        .reaktion_umschalten(message_id, user_id, emoji)
        .await?;

    // Auch beim Entfernen: Clients laden die Reaktionen der Nachricht neu
    state.router.an_alle_senden(
        namen::REACTION_ADDED,
        ReaktionHinzugefuegt {
            message_id,
            user_id,
            emoji: emoji.trim().to_string(),
        },
    );

    Ok(json!({ "active": aktiv }))
}
