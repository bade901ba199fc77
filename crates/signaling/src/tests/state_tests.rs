//! Tests fuer Lebenszyklus und Aufraeumkaskade einer Verbindung

use serde_json::json;
use treffpunkt_core::Rolle;
use treffpunkt_db::{KanalTyp, UserRepository};
use treffpunkt_protocol::ereignisse::namen;

use super::{uuid_von, Umgebung};
use crate::error::SignalingError;
use crate::rooms::RaumName;

#[tokio::test]
async fn trennung_raeumt_raeume_und_voice_auf() {
    let env = Umgebung::neu().await;
    let (user, token) = env.benutzer("alice", Rolle::User).await;
    let (_, token_b) = env.benutzer("bob", Rolle::User).await;
    let a = env.kanal(KanalTyp::Text).await;
    let b = env.kanal(KanalTyp::Text).await;
    let c = env.kanal(KanalTyp::Voice).await;

    let mut x = env.verbinden_als(&token).await;
    let mut beobachter = env.verbinden_als(&token_b).await;

    env.ok(&mut x, "join_channel", json!({ "channel_id": uuid_von(a) })).await;
    env.ok(&mut x, "join_channel", json!({ "channel_id": uuid_von(b) })).await;
    env.ok(&mut beobachter, "join_voice_room", json!({ "channel_id": uuid_von(c) })).await;
    env.ok(&mut x, "voice_join", json!({ "channel_id": uuid_von(c) })).await;
    beobachter.pushes();

    let trennung = env.state.verbindung_trennen(x.id()).await.unwrap();

    let mut raeume = trennung.raeume.clone();
    raeume.sort();
    let mut erwartet = vec![RaumName::kanal(a), RaumName::kanal(b), RaumName::voice(c)];
    erwartet.sort();
    assert_eq!(raeume, erwartet);
    assert_eq!(trennung.voice_verlassen, vec![(c, user)]);

    for raum in &erwartet {
        assert!(!env.state.raeume.ist_mitglied(x.id(), raum));
    }
    assert!(env.state.voice.teilnehmer(c).await.unwrap().is_empty());

    let verlassen = beobachter.pushes_mit_event(namen::USER_LEFT_VOICE);
    assert_eq!(verlassen.len(), 1);
    assert_eq!(verlassen[0].data["user_id"], user.inner().to_string());
    assert_eq!(verlassen[0].data["channel_id"], uuid_von(c));

    // Die getrennte Verbindung bekommt nichts mehr
    assert!(x.pushes().iter().all(|f| f.event != namen::USER_LEFT_VOICE));
}

#[tokio::test]
async fn trennung_ist_idempotent() {
    let env = Umgebung::neu().await;
    let (_, token) = env.benutzer("alice", Rolle::User).await;
    let (_, token_b) = env.benutzer("bob", Rolle::User).await;
    let c = env.kanal(KanalTyp::Voice).await;

    let mut x = env.verbinden_als(&token).await;
    let mut beobachter = env.verbinden_als(&token_b).await;
    env.ok(&mut beobachter, "join_voice_room", json!({ "channel_id": uuid_von(c) })).await;
    env.ok(&mut x, "voice_join", json!({ "channel_id": uuid_von(c) })).await;
    beobachter.pushes();

    assert!(env.state.verbindung_trennen(x.id()).await.is_some());
    assert!(env.state.verbindung_trennen(x.id()).await.is_none());

    assert_eq!(beobachter.pushes_mit_event(namen::USER_LEFT_VOICE).len(), 1);
    assert!(!env.state.registry.ist_live(x.id()));
}

#[tokio::test]
async fn raum_beitritt_nach_trennung_scheitert() {
    let env = Umgebung::neu().await;
    let v = env.verbinden();
    let raum = RaumName::neu("lobby");

    env.state.verbindung_trennen(v.id()).await.unwrap();

    assert!(matches!(
        env.state.raum_beitreten(v.id(), &raum),
        Err(SignalingError::VerbindungGetrennt)
    ));
    assert!(env.state.raeume.mitglieder(&raum).is_empty());
    assert_eq!(env.state.raeume.raum_anzahl(), 0);
}

#[tokio::test]
async fn presence_folgt_der_letzten_verbindung() {
    let env = Umgebung::neu().await;
    let (user, token) = env.benutzer("alice", Rolle::User).await;

    let erste = env.verbinden_als(&token).await;
    let zweite = env.verbinden_als(&token).await;
    assert!(env.db.benutzer_laden(user).await.unwrap().unwrap().is_online);

    let trennung = env.state.verbindung_trennen(erste.id()).await.unwrap();
    assert!(!trennung.offline);
    assert!(env.db.benutzer_laden(user).await.unwrap().unwrap().is_online);

    let trennung = env.state.verbindung_trennen(zweite.id()).await.unwrap();
    assert!(trennung.offline);
    let benutzer = env.db.benutzer_laden(user).await.unwrap().unwrap();
    assert!(!benutzer.is_online);
    assert!(benutzer.last_seen.is_some());
}

#[tokio::test]
async fn authentifizieren_bindet_genau_einen_benutzer() {
    let env = Umgebung::neu().await;
    let (alice, token_a) = env.benutzer("alice", Rolle::User).await;
    let (_, token_b) = env.benutzer("bob", Rolle::User).await;
    let v = env.verbinden();

    let identitaet = env.state.authentifizieren(v.id(), &token_a).await.unwrap();
    assert_eq!(identitaet.user_id, alice);
    assert_eq!(env.state.registry.benutzer_von(v.id()), Some(alice));

    // Gleicher Benutzer erneut: erlaubt
    env.state.authentifizieren(v.id(), &token_a).await.unwrap();

    assert!(matches!(
        env.state.authentifizieren(v.id(), &token_b).await,
        Err(SignalingError::Konflikt(_))
    ));
    assert_eq!(env.state.registry.benutzer_von(v.id()), Some(alice));

    assert!(matches!(
        env.state.authentifizieren(v.id(), "kein-token").await,
        Err(SignalingError::Auth(_))
    ));
}

#[tokio::test]
async fn authentifizieren_nach_trennung() {
    let env = Umgebung::neu().await;
    let (user, token) = env.benutzer("alice", Rolle::User).await;
    let v = env.verbinden();
    env.state.verbindung_trennen(v.id()).await.unwrap();

    assert!(matches!(
        env.state.authentifizieren(v.id(), &token).await,
        Err(SignalingError::VerbindungGetrennt)
    ));
    assert!(env.state.registry.verbindungen_von_benutzer(user).is_empty());
}
