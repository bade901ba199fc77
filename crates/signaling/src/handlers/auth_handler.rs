//! Auth-Handler – bindet eine Identitaet an die Verbindung

use serde_json::{json, Value};
use std::sync::Arc;
use treffpunkt_auth::IdentityProvider;
use treffpunkt_core::ConnectionId;
use treffpunkt_db::RecordStore;

use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// `authenticate`: Token pruefen und Benutzer an die Verbindung binden
pub async fn handle_authenticate<S, I>(
    token: &str,
    connection_id: ConnectionId,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let identitaet = state.authentifizieren(connection_id, token).await?;
    Ok(json!({
        "user_id": identitaet.user_id,
        "username": identitaet.username,
        "role": identitaet.rolle.als_str(),
        "connection_id": connection_id,
    }))
}
