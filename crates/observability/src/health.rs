//! Health-Check-Endpunkt fuer Treffpunkt
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, DB-Status und Verbindungszahl

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_connected: bool,
    pub connections: u64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Wird vom Server periodisch aktualisiert.
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    db_connected: Arc<AtomicBool>,
    verbindungen: Arc<AtomicU64>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db_connected: Arc::new(AtomicBool::new(true)),
            verbindungen: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn db_verbunden(&self) -> bool {
        self.db_connected.load(Ordering::Relaxed)
    }

    pub fn db_status_setzen(&self, verbunden: bool) {
        self.db_connected.store(verbunden, Ordering::Relaxed);
    }

    pub fn verbindungen_setzen(&self, anzahl: u64) {
        self.verbindungen.store(anzahl, Ordering::Relaxed);
    }

    pub fn antwort(&self) -> HealthResponse {
        let db_connected = self.db_verbunden();
        HealthResponse {
            status: if db_connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            db_connected,
            connections: self.verbindungen.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    // 200 auch bei degraded, die Probe soll nicht fehlschlagen
    (StatusCode::OK, Json(state.antwort()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ist_healthy() {
        let state = HealthState::neu();
        let antwort = state.antwort();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert!(antwort.uptime_seconds < 5);
        assert_eq!(antwort.connections, 0);
    }

    #[test]
    fn db_ausfall_ist_degraded() {
        let state = HealthState::neu();
        state.db_status_setzen(false);
        state.verbindungen_setzen(3);

        let json = serde_json::to_value(state.antwort()).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["db_connected"], false);
        assert_eq!(json["connections"], 3);
    }

    #[test]
    fn klone_teilen_den_zustand() {
        let state = HealthState::neu();
        let klon = state.clone();
        klon.db_status_setzen(false);
        assert!(!state.db_verbunden());
    }
}
