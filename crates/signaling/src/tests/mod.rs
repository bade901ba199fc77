//! Unit-Tests fuer den Echtzeit-Kern
//!
//! Alle Tests laufen gegen eine In-Memory-SQLite-Datenbank und den echten
//! AuthService als Identity Provider.

mod state_tests;

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use treffpunkt_auth::{AuthService, SessionStore};
use treffpunkt_core::{ChannelId, ConnectionId, Rolle, UserId};
use treffpunkt_db::{ChannelRepository, KanalTyp, NeuerKanal, SqliteDb};
use treffpunkt_protocol::Frame;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::{SignalingConfig, SignalingState};

pub(crate) type TestState = SignalingState<SqliteDb, AuthService<SqliteDb>>;

pub(crate) struct Umgebung {
    pub state: Arc<TestState>,
    pub db: Arc<SqliteDb>,
    pub auth: Arc<AuthService<SqliteDb>>,
    pub dispatcher: MessageDispatcher<SqliteDb, AuthService<SqliteDb>>,
}

/// Eine Test-Verbindung mit ihrer Sende-Queue
pub(crate) struct TestVerbindung {
    pub ctx: DispatcherContext,
    pub rx: mpsc::Receiver<Frame>,
}

impl TestVerbindung {
    pub fn id(&self) -> ConnectionId {
        self.ctx.connection_id
    }

    /// Alle bisher eingestellten Pushes
    pub fn pushes(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(f) = self.rx.try_recv() {
            frames.push(f);
        }
        frames
    }

    pub fn pushes_mit_event(&mut self, event: &str) -> Vec<Frame> {
        self.pushes().into_iter().filter(|f| f.event == event).collect()
    }
}

impl Umgebung {
    pub async fn neu() -> Self {
        let db = Arc::new(
            SqliteDb::in_memory()
                .await
                .expect("In-Memory-DB konnte nicht geoeffnet werden"),
        );
        let auth = Arc::new(AuthService::neu(Arc::clone(&db), SessionStore::neu()));
        let state = SignalingState::neu(
            SignalingConfig::default(),
            Arc::clone(&db),
            Arc::clone(&auth),
        );
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        Self {
            state,
            db,
            auth,
            dispatcher,
        }
    }

    /// Registriert einen Benutzer und liefert ID und Session-Token
    pub async fn benutzer(&self, name: &str, rolle: Rolle) -> (UserId, String) {
        let user = self
            .auth
            .registrieren(name, None, "geheim123", rolle)
            .await
            .expect("Registrierung fehlgeschlagen");
        let (_, session) = self
            .auth
            .anmelden(name, "geheim123")
            .await
            .expect("Anmeldung fehlgeschlagen");
        (user.id, session.token)
    }

    pub async fn kanal(&self, typ: KanalTyp) -> ChannelId {
        self.db
            .kanal_erstellen(NeuerKanal {
                name: "testkanal",
                description: None,
                channel_type: typ,
                is_private: false,
                created_by: None,
            })
            .await
            .expect("Kanal anlegen fehlgeschlagen")
            .id
    }

    /// Laesst jedes Loeschen von Voice-Teilnehmern in der DB fehlschlagen
    pub async fn teilnehmer_loeschen_blockieren(&self) {
        sqlx::query(
            "CREATE TRIGGER loeschen_blockiert BEFORE DELETE ON voice_participants \
             BEGIN SELECT RAISE(ABORT, 'Loeschen blockiert'); END",
        )
        .execute(self.db.pool())
        .await
        .expect("Trigger anlegen fehlgeschlagen");
    }

    pub async fn teilnehmer_loeschen_freigeben(&self) {
        sqlx::query("DROP TRIGGER loeschen_blockiert")
            .execute(self.db.pool())
            .await
            .expect("Trigger entfernen fehlgeschlagen");
    }

    pub fn verbinden(&self) -> TestVerbindung {
        let (id, rx) = self.state.verbindung_oeffnen();
        TestVerbindung {
            ctx: DispatcherContext::neu(id, None),
            rx,
        }
    }

    /// Verbindet und authentifiziert ueber den Dispatcher
    pub async fn verbinden_als(&self, token: &str) -> TestVerbindung {
        let mut v = self.verbinden();
        let antwort = self
            .senden(&mut v, 1, "authenticate", json!({ "token": token }))
            .await
            .expect("authenticate ohne Antwort");
        assert_eq!(antwort.event, "ok", "authenticate fehlgeschlagen: {antwort:?}");
        v
    }

    pub async fn senden(
        &self,
        v: &mut TestVerbindung,
        request_id: u32,
        event: &str,
        data: Value,
    ) -> Option<Frame> {
        self.dispatcher
            .dispatch(Frame::neu(request_id, event, data), &mut v.ctx)
            .await
    }

    /// Sendet und erwartet eine `ok`-Antwort
    pub async fn ok(&self, v: &mut TestVerbindung, event: &str, data: Value) -> Value {
        let antwort = self
            .senden(v, 7, event, data)
            .await
            .expect("keine Antwort");
        assert_eq!(antwort.event, "ok", "{event} fehlgeschlagen: {antwort:?}");
        assert_eq!(antwort.request_id, 7);
        antwort.data
    }

    /// Sendet und liefert den Fehlercode der `error`-Antwort
    pub async fn fehler(&self, v: &mut TestVerbindung, event: &str, data: Value) -> String {
        let antwort = self
            .senden(v, 9, event, data)
            .await
            .expect("keine Antwort");
        assert_eq!(antwort.event, "error", "{event} unerwartet erfolgreich");
        assert_eq!(antwort.request_id, 9);
        antwort.data["code"].as_str().unwrap_or_default().to_string()
    }
}

pub(crate) fn uuid_von(id: ChannelId) -> String {
    id.inner().to_string()
}
