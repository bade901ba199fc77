//! WebRTC-Handler – Offer/Answer/ICE an genau eine Ziel-Verbindung

use serde_json::{json, Value};
use std::sync::Arc;
use treffpunkt_core::ConnectionId;

use crate::error::SignalingResult;
use crate::relay::SignalArt;
use crate::server_state::SignalingState;

/// WebRTC-Offer, -Answer oder ICE-Kandidat an genau eine Verbindung
///
/// `delivered` ist `false` wenn das Ziel nicht (mehr) verbunden ist.
pub fn handle_signal<S, I>(
    art: SignalArt,
    von: ConnectionId,
    ziel: ConnectionId,
    payload: Value,
    state: &Arc<SignalingState<S, I>>,
) -> SignalingResult<Value> {
    let zugestellt = state.relay.weiterleiten(art, von, ziel, payload);
    Ok(json!({ "delivered": zugestellt }))
}
