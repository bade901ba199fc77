//! Integration-Tests fuer VoiceParticipantRepository (In-Memory SQLite)

use treffpunkt_core::Rolle;
use treffpunkt_db::{
    BenutzerRecord, ChannelRepository, KanalRecord, KanalTyp, NeuerBenutzer, NeuerKanal,
    NeuerVoiceTeilnehmer, SqliteDb, UserRepository, VoiceParticipantRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn benutzer(db: &SqliteDb, name: &str) -> BenutzerRecord {
    db.benutzer_erstellen(NeuerBenutzer {
        username: name,
        email: None,
        password_hash: "hash",
        role: Rolle::User,
    })
    .await
    .unwrap()
}

async fn voice_kanal(db: &SqliteDb) -> KanalRecord {
    db.kanal_erstellen(NeuerKanal {
        name: "Voice",
        description: None,
        channel_type: KanalTyp::Voice,
        is_private: false,
        created_by: None,
    })
    .await
    .unwrap()
}

fn eintrag<'a>(kanal: &KanalRecord, user: &'a BenutzerRecord) -> NeuerVoiceTeilnehmer<'a> {
    NeuerVoiceTeilnehmer {
        channel_id: kanal.id,
        user_id: user.id,
        username: &user.username,
        avatar: user.avatar.as_deref(),
    }
}

#[tokio::test]
async fn einfuegen_ist_idempotent() {
    let db = db().await;
    let kanal = voice_kanal(&db).await;
    let user = benutzer(&db, "alice").await;

    let (erster, neu) = db.teilnehmer_einfuegen(eintrag(&kanal, &user)).await.unwrap();
    assert!(neu);
    assert!(!erster.is_muted);

    let (zweiter, neu) = db.teilnehmer_einfuegen(eintrag(&kanal, &user)).await.unwrap();
    assert!(!neu);
    assert_eq!(zweiter, erster);

    assert_eq!(db.teilnehmer_auflisten(kanal.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn auflisten_in_beitrittsreihenfolge() {
    let db = db().await;
    let kanal = voice_kanal(&db).await;
    let namen = ["x", "y", "z"];
    for name in namen {
        let user = benutzer(&db, name).await;
        db.teilnehmer_einfuegen(eintrag(&kanal, &user)).await.unwrap();
    }

    let liste = db.teilnehmer_auflisten(kanal.id).await.unwrap();
    let reihenfolge: Vec<_> = liste.iter().map(|t| t.username.as_str()).collect();
    assert_eq!(reihenfolge, namen);
}

#[tokio::test]
async fn stumm_setzen_und_entfernen() {
    let db = db().await;
    let kanal = voice_kanal(&db).await;
    let user = benutzer(&db, "bob").await;

    assert!(!db.teilnehmer_stumm_setzen(kanal.id, user.id, true).await.unwrap());

    db.teilnehmer_einfuegen(eintrag(&kanal, &user)).await.unwrap();
    assert!(db.teilnehmer_stumm_setzen(kanal.id, user.id, true).await.unwrap());
    let t = db.teilnehmer_laden(kanal.id, user.id).await.unwrap().unwrap();
    assert!(t.is_muted);

    assert!(db.teilnehmer_entfernen(kanal.id, user.id).await.unwrap());
    assert!(!db.teilnehmer_entfernen(kanal.id, user.id).await.unwrap());
    assert!(db.teilnehmer_laden(kanal.id, user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn alle_entfernen() {
    let db = db().await;
    let kanal = voice_kanal(&db).await;
    let a = benutzer(&db, "a").await;
    let b = benutzer(&db, "b").await;
    db.teilnehmer_einfuegen(eintrag(&kanal, &a)).await.unwrap();
    db.teilnehmer_einfuegen(eintrag(&kanal, &b)).await.unwrap();

    assert_eq!(db.teilnehmer_alle_entfernen().await.unwrap(), 2);
    assert!(db.teilnehmer_auflisten(kanal.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn kanal_loeschen_entfernt_teilnehmer() {
    let db = db().await;
    let kanal = voice_kanal(&db).await;
    let user = benutzer(&db, "c").await;
    db.teilnehmer_einfuegen(eintrag(&kanal, &user)).await.unwrap();

    db.kanal_loeschen(kanal.id).await.unwrap();
    assert!(db.teilnehmer_laden(kanal.id, user.id).await.unwrap().is_none());
}
