//! WebRTC-Signalisierungsrelay
//!
//! Offer, Answer und ICE-Kandidaten werden unveraendert an genau eine
//! Ziel-Verbindung weitergereicht, ergaenzt um die Absender-Verbindung.
//! Ist das Ziel nicht mehr verbunden, wird still verworfen.

use serde_json::{Map, Value};
use treffpunkt_core::ConnectionId;
use treffpunkt_protocol::ereignisse::namen;

use crate::router::EventRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalArt {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalArt {
    /// Event-Name des weitergeleiteten Pushes
    pub fn event(&self) -> &'static str {
        match self {
            Self::Offer => namen::WEBRTC_OFFER,
            Self::Answer => namen::WEBRTC_ANSWER,
            Self::IceCandidate => namen::WEBRTC_ICE_CANDIDATE,
        }
    }

    /// Feldname der Nutzlast
    pub fn feld(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "candidate",
        }
    }
}

#[derive(Clone)]
pub struct SignalingRelay {
    router: EventRouter,
}

impl SignalingRelay {
    pub fn neu(router: EventRouter) -> Self {
        Self { router }
    }

    /// Leitet ein Signal weiter; `true` wenn es eingestellt wurde
    pub fn weiterleiten(
        &self,
        art: SignalArt,
        von: ConnectionId,
        ziel: ConnectionId,
        payload: Value,
    ) -> bool {
        let mut data = Map::new();
        data.insert(art.feld().into(), payload);
        data.insert("from".into(), Value::String(von.inner().to_string()));

        let zugestellt = self
            .router
            .an_verbindung_senden(ziel, art.event(), Value::Object(data));
        if !zugestellt {
            tracing::debug!(
                von = %von,
                ziel = %ziel,
                event = art.event(),
                "Signal nicht zustellbar, verworfen"
            );
        }
        zugestellt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VerbindungsRegistry;
    use crate::rooms::RaumManager;
    use serde_json::json;

    #[tokio::test]
    async fn offer_wird_mit_absender_weitergeleitet() {
        let registry = VerbindungsRegistry::neu();
        let relay = SignalingRelay::neu(EventRouter::neu(registry.clone(), RaumManager::neu()));
        let von = ConnectionId::new();
        let ziel = ConnectionId::new();
        let mut rx = registry.registrieren(ziel);

        let sdp = json!({"type": "offer", "sdp": "v=0..."});
        assert!(relay.weiterleiten(SignalArt::Offer, von, ziel, sdp.clone()));

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "webrtc_offer");
        assert_eq!(frame.data["offer"], sdp);
        assert_eq!(frame.data["from"], von.inner().to_string());
        assert!(frame.ist_push());
    }

    #[test]
    fn totes_ziel_wird_still_verworfen() {
        let registry = VerbindungsRegistry::neu();
        let relay = SignalingRelay::neu(EventRouter::neu(registry, RaumManager::neu()));
        assert!(!relay.weiterleiten(
            SignalArt::IceCandidate,
            ConnectionId::new(),
            ConnectionId::new(),
            json!({"candidate": "x"}),
        ));
    }

    #[test]
    fn event_namen() {
        assert_eq!(SignalArt::Answer.event(), "webrtc_answer");
        assert_eq!(SignalArt::IceCandidate.feld(), "candidate");
    }
}
