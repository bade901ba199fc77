//! Integration-Tests fuer ChannelRepository (In-Memory SQLite)

use treffpunkt_core::ChannelId;
use treffpunkt_db::{ChannelRepository, KanalTyp, NeuerKanal, SqliteDb};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

#[tokio::test]
async fn kanal_erstellen_und_laden() {
    let db = db().await;

    let kanal = db
        .kanal_erstellen(NeuerKanal {
            name: "Lobby",
            description: Some("Treffpunkt"),
            channel_type: KanalTyp::Voice,
            is_private: false,
            created_by: None,
        })
        .await
        .unwrap();

    assert!(kanal.ist_voice());

    let geladen = db.kanal_laden(kanal.id).await.unwrap().unwrap();
    assert_eq!(geladen.id, kanal.id);
    assert_eq!(geladen.name, "Lobby");
    assert_eq!(geladen.description.as_deref(), Some("Treffpunkt"));
    assert_eq!(geladen.channel_type, KanalTyp::Voice);
    assert!(geladen.created_by.is_none());
}

#[tokio::test]
async fn unbekannter_kanal() {
    let db = db().await;
    assert!(db.kanal_laden(ChannelId::new()).await.unwrap().is_none());
    assert!(!db.kanal_loeschen(ChannelId::new()).await.unwrap());
}

#[tokio::test]
async fn standard_kanaele_nur_bei_leerer_db() {
    let db = db().await;

    assert_eq!(db.standard_kanaele_anlegen().await.unwrap(), 5);
    assert_eq!(db.kanal_anzahl().await.unwrap(), 5);

    // Zweiter Aufruf legt nichts mehr an
    assert_eq!(db.standard_kanaele_anlegen().await.unwrap(), 0);

    let kanaele = db.kanaele_auflisten().await.unwrap();
    assert_eq!(kanaele.iter().filter(|k| k.ist_voice()).count(), 2);
    assert_eq!(kanaele[0].name, "Allgemein");
}

#[tokio::test]
async fn kanal_loeschen() {
    let db = db().await;
    let kanal = db
        .kanal_erstellen(NeuerKanal {
            name: "Temp",
            description: None,
            channel_type: KanalTyp::Text,
            is_private: true,
            created_by: None,
        })
        .await
        .unwrap();

    assert!(db.kanal_loeschen(kanal.id).await.unwrap());
    assert!(db.kanal_laden(kanal.id).await.unwrap().is_none());
}
