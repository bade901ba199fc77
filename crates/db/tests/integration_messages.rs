//! Integration-Tests fuer MessageRepository (In-Memory SQLite)

use treffpunkt_core::{MessageId, Rolle};
use treffpunkt_db::{
    BenutzerRecord, ChannelRepository, KanalRecord, KanalTyp, MessageRepository, NeueNachricht,
    NeuerBenutzer, NeuerKanal, SqliteDb, UserRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn aufbau(db: &SqliteDb) -> (BenutzerRecord, KanalRecord) {
    let user = db
        .benutzer_erstellen(NeuerBenutzer {
            username: "alice",
            email: None,
            password_hash: "hash",
            role: Rolle::User,
        })
        .await
        .unwrap();
    let kanal = db
        .kanal_erstellen(NeuerKanal {
            name: "Allgemein",
            description: None,
            channel_type: KanalTyp::Text,
            is_private: false,
            created_by: Some(user.id),
        })
        .await
        .unwrap();
    (user, kanal)
}

fn nachricht<'a>(user: &'a BenutzerRecord, kanal: &KanalRecord, text: &'a str) -> NeueNachricht<'a> {
    NeueNachricht {
        channel_id: kanal.id,
        user_id: user.id,
        username: &user.username,
        avatar: None,
        content: text,
    }
}

#[tokio::test]
async fn nachricht_erstellen_und_laden() {
    let db = db().await;
    let (user, kanal) = aufbau(&db).await;

    let n = db.nachricht_erstellen(nachricht(&user, &kanal, "Hallo")).await.unwrap();
    assert_eq!(n.username, "alice");

    let geladen = db.nachricht_laden(n.id).await.unwrap().unwrap();
    assert_eq!(geladen.content, "Hallo");
    assert!(geladen.reactions.is_empty());
    assert!(db.nachricht_laden(MessageId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn verlauf_chronologisch_und_begrenzt() {
    let db = db().await;
    let (user, kanal) = aufbau(&db).await;

    for i in 0..5 {
        let text = format!("Nachricht {i}");
        db.nachricht_erstellen(nachricht(&user, &kanal, &text)).await.unwrap();
    }

    let verlauf = db.nachrichten_auflisten(kanal.id, 3).await.unwrap();
    let inhalte: Vec<_> = verlauf.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(inhalte, ["Nachricht 2", "Nachricht 3", "Nachricht 4"]);
}

#[tokio::test]
async fn reaktion_umschalten() {
    let db = db().await;
    let (user, kanal) = aufbau(&db).await;
    let n = db.nachricht_erstellen(nachricht(&user, &kanal, "Hi")).await.unwrap();

    assert!(db.reaktion_umschalten(n.id, user.id, "👍").await.unwrap());
    let mit = db.nachricht_laden(n.id).await.unwrap().unwrap();
    assert_eq!(mit.reactions.len(), 1);
    assert_eq!(mit.reactions[0].emoji, "👍");

    // Gleiche Reaktion nochmal entfernt sie
    assert!(!db.reaktion_umschalten(n.id, user.id, "👍").await.unwrap());
    let ohne = db.nachricht_laden(n.id).await.unwrap().unwrap();
    assert!(ohne.reactions.is_empty());
}

#[tokio::test]
async fn loeschen_entfernt_reaktionen() {
    let db = db().await;
    let (user, kanal) = aufbau(&db).await;
    let n = db.nachricht_erstellen(nachricht(&user, &kanal, "weg")).await.unwrap();
    db.reaktion_umschalten(n.id, user.id, "🔥").await.unwrap();

    assert!(db.nachricht_loeschen(n.id).await.unwrap());
    assert!(!db.nachricht_loeschen(n.id).await.unwrap());
    assert!(db.nachricht_laden(n.id).await.unwrap().is_none());
}
