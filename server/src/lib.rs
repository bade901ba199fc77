//! treffpunkt-server – Bibliotheks-Root
//!
//! Verdrahtet Datenbank, Auth, Echtzeit-Kern und Observability und stellt den
//! Einstiegspunkt fuer Tests bereit.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use config::ServerConfig;
use tokio::sync::watch;
use treffpunkt_auth::{AuthService, SessionStore};
use treffpunkt_db::{ChannelRepository, SqliteDb, UserRepository, VoiceParticipantRepository};
use treffpunkt_observability::{
    observability_server_starten, EchtzeitStand, HealthState, TreffpunktMetrics,
};
use treffpunkt_signaling::{SignalingServer, SignalingState};

/// Konkreter Echtzeit-Zustand des Servers
pub type Zustand = SignalingState<SqliteDb, AuthService<SqliteDb>>;

/// Ergebnis der Initialisierung
pub struct Initialisiert {
    pub db: Arc<SqliteDb>,
    pub auth: Arc<AuthService<SqliteDb>>,
    pub sessions: Arc<SessionStore>,
    pub zustand: Arc<Zustand>,
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Oeffnet die Datenbank und baut den Echtzeit-Zustand auf
    ///
    /// Nach einem Neustart gibt es keine Verbindungen: Online-Flags und
    /// Voice-Teilnahmen aus dem letzten Lauf werden zurueckgesetzt.
    pub async fn initialisieren(&self) -> Result<Initialisiert> {
        let db = Arc::new(SqliteDb::oeffnen(&self.config.datenbank_config()).await?);

        let offline = db.alle_offline_setzen().await?;
        let verwaist = db.teilnehmer_alle_entfernen().await?;
        let angelegt = db.standard_kanaele_anlegen().await?;
        tracing::info!(
            offline_gesetzt = offline,
            voice_bereinigt = verwaist,
            kanaele_angelegt = angelegt,
            "Datenbank bereit"
        );

        let sessions = SessionStore::mit_ttl(self.config.session_ttl());
        let auth = Arc::new(AuthService::neu(Arc::clone(&db), Arc::clone(&sessions)));
        let zustand = SignalingState::neu(
            self.config.signaling_config(),
            Arc::clone(&db),
            Arc::clone(&auth),
        );

        Ok(Initialisiert {
            db,
            auth,
            sessions,
            zustand,
        })
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen, Altlasten bereinigen, Standard-Kanaele anlegen
    /// 2. Observability-Server und Metriken-Task starten
    /// 3. Echtzeit-Server starten
    /// 4. Auf Ctrl-C warten, dann Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        let tcp_adresse = self.config.tcp_bind_adresse()?;
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %tcp_adresse,
            max_verbindungen = self.config.server.max_verbindungen,
            "Server startet"
        );

        let Initialisiert {
            db,
            sessions,
            zustand,
            ..
        } = self.initialisieren().await?;
        let _session_cleanup = sessions.cleanup_starten();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let metriken = TreffpunktMetrics::neu()?;
            let health = HealthState::neu();
            let intervall =
                Duration::from_secs(self.config.observability.metriken_intervall_sek.max(1));

            tokio::spawn(zustand_beobachten(
                Arc::clone(&zustand),
                db,
                metriken.clone(),
                health.clone(),
                intervall,
                shutdown_rx.clone(),
            ));

            tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        SignalingServer::neu(zustand, tcp_adresse)
            .starten(shutdown_rx)
            .await?;

        tracing::info!("Server beendet");
        Ok(())
    }
}

/// Momentaufnahme des Echtzeit-Kerns
pub fn stand_erfassen(zustand: &Zustand) -> EchtzeitStand {
    EchtzeitStand {
        verbindungen: zustand.registry.anzahl() as u64,
        authentifiziert: zustand.registry.authentifizierte_anzahl() as u64,
        raeume: zustand.raeume.raum_anzahl() as u64,
        voice_teilnahmen: zustand.voice.bindungs_anzahl() as u64,
        verworfen: zustand.registry.verworfene_anzahl(),
    }
}

/// Uebertraegt periodisch den Echtzeit-Stand in Metriken und Health-Zustand
async fn zustand_beobachten(
    zustand: Arc<Zustand>,
    db: Arc<SqliteDb>,
    metriken: TreffpunktMetrics,
    health: HealthState,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(intervall);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stand = stand_erfassen(&zustand);
                metriken.stand_uebernehmen(stand);
                health.verbindungen_setzen(stand.verbindungen);
                health.db_status_setzen(db.ist_erreichbar().await);
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Metriken-Task beendet");
}

#[cfg(test)]
mod tests {
    use super::*;
    use treffpunkt_core::Rolle;
    use treffpunkt_db::{KanalTyp, NeuerBenutzer, NeuerVoiceTeilnehmer};

    fn test_config(verzeichnis: &tempfile::TempDir) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.datenbank.url = format!(
            "sqlite://{}",
            verzeichnis.path().join("treffpunkt.db").display()
        );
        config
    }

    #[tokio::test]
    async fn initialisieren_legt_standard_kanaele_an() {
        let verzeichnis = tempfile::tempdir().unwrap();
        let server = Server::neu(test_config(&verzeichnis));

        let init = server.initialisieren().await.unwrap();
        let kanaele = init.db.kanaele_auflisten().await.unwrap();
        assert_eq!(kanaele.len(), 5);
        assert_eq!(
            kanaele
                .iter()
                .filter(|k| k.channel_type == KanalTyp::Voice)
                .count(),
            2
        );
        assert_eq!(stand_erfassen(&init.zustand), EchtzeitStand::default());
    }

    #[tokio::test]
    async fn neustart_raeumt_altlasten_auf() {
        let verzeichnis = tempfile::tempdir().unwrap();
        let server = Server::neu(test_config(&verzeichnis));

        let erster = server.initialisieren().await.unwrap();
        let voice = erster
            .db
            .kanaele_auflisten()
            .await
            .unwrap()
            .into_iter()
            .find(|k| k.channel_type == KanalTyp::Voice)
            .unwrap();
        let user = erster
            .db
            .benutzer_erstellen(NeuerBenutzer {
                username: "alice",
                email: None,
                password_hash: "hash",
                role: Rolle::User,
            })
            .await
            .unwrap();
        erster.db.presence_setzen(user.id, true).await.unwrap();
        erster
            .db
            .teilnehmer_einfuegen(NeuerVoiceTeilnehmer {
                channel_id: voice.id,
                user_id: user.id,
                username: "alice",
                avatar: None,
            })
            .await
            .unwrap();
        drop(erster);

        let zweiter = server.initialisieren().await.unwrap();
        assert!(zweiter.db.online_benutzer().await.unwrap().is_empty());
        assert!(zweiter
            .db
            .teilnehmer_auflisten(voice.id)
            .await
            .unwrap()
            .is_empty());
        // Kanaele werden nicht doppelt angelegt
        assert_eq!(zweiter.db.kanaele_auflisten().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn stand_zaehlt_verbindungen_und_raeume() {
        let verzeichnis = tempfile::tempdir().unwrap();
        let init = Server::neu(test_config(&verzeichnis))
            .initialisieren()
            .await
            .unwrap();

        let (a, _rx_a) = init.zustand.verbindung_oeffnen();
        let (_b, _rx_b) = init.zustand.verbindung_oeffnen();
        init.zustand
            .raum_beitreten(a, &treffpunkt_signaling::RaumName::neu("lobby"))
            .unwrap();

        let stand = stand_erfassen(&init.zustand);
        assert_eq!(stand.verbindungen, 2);
        assert_eq!(stand.authentifiziert, 0);
        assert_eq!(stand.raeume, 1);

        init.zustand.verbindung_trennen(a).await;
        let stand = stand_erfassen(&init.zustand);
        assert_eq!(stand.verbindungen, 1);
        assert_eq!(stand.raeume, 0);
    }
}
