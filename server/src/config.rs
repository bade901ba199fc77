//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, der Server startet also auch ohne Konfigurationsdatei.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use treffpunkt_db::DatabaseConfig;
use treffpunkt_observability::logging::{log_format_gueltig, log_level_gueltig};
use treffpunkt_signaling::SignalingConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerEinstellungen,
    pub netzwerk: NetzwerkEinstellungen,
    pub datenbank: DatenbankEinstellungen,
    /// Verbindungs- und Keepalive-Parameter
    pub signaling: SignalingEinstellungen,
    pub auth: AuthEinstellungen,
    pub logging: LoggingEinstellungen,
    /// Metriken und Health-Check
    pub observability: ObservabilityEinstellungen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename (nur fuer Logs)
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_verbindungen: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Treffpunkt".into(),
            max_verbindungen: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer das Frame-Protokoll
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9987,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    pub sqlite_wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        let standard = DatabaseConfig::default();
        Self {
            url: standard.url,
            max_verbindungen: standard.max_verbindungen,
            sqlite_wal: standard.sqlite_wal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Intervall der Keepalive-Pings
    pub keepalive_sek: u64,
    /// Verbindung wird nach dieser Zeit ohne eingehende Frames getrennt
    pub verbindungs_timeout_sek: u64,
    /// Ausgehende Frames pro Verbindung bevor verworfen wird
    pub send_queue_groesse: usize,
    pub max_frame_groesse: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            keepalive_sek: standard.keepalive_sek,
            verbindungs_timeout_sek: standard.verbindungs_timeout_sek,
            send_queue_groesse: standard.send_queue_groesse,
            max_frame_groesse: standard.max_frame_groesse,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Gueltigkeit eines Session-Tokens
    pub session_ttl_stunden: u64,
}

impl Default for AuthEinstellungen {
    fn default() -> Self {
        Self {
            session_ttl_stunden: 30 * 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// "trace", "debug", "info", "warn" oder "error"
    pub level: String,
    /// "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    pub aktiviert: bool,
    /// Port fuer /metrics und /health
    pub port: u16,
    /// Wie oft Gauges und Health-Zustand aktualisiert werden
    pub metriken_intervall_sek: u64,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
            metriken_intervall_sek: 5,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        if self.server.max_verbindungen == 0 {
            bail!("server.max_verbindungen muss groesser als 0 sein");
        }
        if self.signaling.send_queue_groesse == 0 {
            bail!("signaling.send_queue_groesse muss groesser als 0 sein");
        }
        if self.signaling.keepalive_sek == 0 {
            bail!("signaling.keepalive_sek muss groesser als 0 sein");
        }
        if self.signaling.verbindungs_timeout_sek <= self.signaling.keepalive_sek {
            bail!(
                "signaling.verbindungs_timeout_sek ({}) muss groesser als keepalive_sek ({}) sein",
                self.signaling.verbindungs_timeout_sek,
                self.signaling.keepalive_sek
            );
        }
        self.tcp_bind_adresse()?;
        if self.observability.aktiviert {
            self.observability_bind_adresse()?;
        }
        Ok(())
    }

    /// Bind-Adresse fuer das Frame-Protokoll
    pub fn tcp_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige TCP-Bind-Adresse '{adresse}'"))
    }

    /// Bind-Adresse fuer den Observability-Server
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Observability-Bind-Adresse '{adresse}'"))
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.sqlite_wal,
        }
    }

    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_verbindungen: self.server.max_verbindungen,
            keepalive_sek: self.signaling.keepalive_sek,
            verbindungs_timeout_sek: self.signaling.verbindungs_timeout_sek,
            send_queue_groesse: self.signaling.send_queue_groesse,
            max_frame_groesse: self.signaling.max_frame_groesse,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_stunden.saturating_mul(60 * 60))
    }
}
