//! Prometheus-kompatible Metriken fuer Treffpunkt
//!
//! Registrierte Metriken:
//! - `treffpunkt_connections_active` – Gauge: Live-Verbindungen
//! - `treffpunkt_connections_authenticated` – Gauge: davon authentifiziert
//! - `treffpunkt_rooms_active` – Gauge: nicht-leere Raeume
//! - `treffpunkt_voice_participations` – Gauge: von Verbindungen getragene Voice-Teilnahmen
//! - `treffpunkt_frames_dropped_total` – Counter: verworfene Pushes (volle Queue)
//! - `treffpunkt_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `treffpunkt_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! Unter Linux kommen die Standard-Prozessmetriken (`process_*`) hinzu.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Momentaufnahme des Echtzeit-Kerns fuer die Gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchtzeitStand {
    pub verbindungen: u64,
    pub authentifiziert: u64,
    pub raeume: u64,
    pub voice_teilnahmen: u64,
    /// Kumulativ seit Serverstart
    pub verworfen: u64,
}

#[derive(Clone)]
pub struct TreffpunktMetrics {
    pub registry: Arc<Registry>,

    pub connections_active: IntGauge,
    pub connections_authenticated: IntGauge,
    pub rooms_active: IntGauge,
    pub voice_participations: IntGauge,
    pub frames_dropped_total: IntCounter,

    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

fn gauge(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

impl TreffpunktMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connections_active = gauge(
            &registry,
            "treffpunkt_connections_active",
            "Anzahl aktuell verbundener Clients",
        )?;
        let connections_authenticated = gauge(
            &registry,
            "treffpunkt_connections_authenticated",
            "Anzahl authentifizierter Verbindungen",
        )?;
        let rooms_active = gauge(
            &registry,
            "treffpunkt_rooms_active",
            "Anzahl nicht-leerer Raeume",
        )?;
        let voice_participations = gauge(
            &registry,
            "treffpunkt_voice_participations",
            "Von Verbindungen getragene Voice-Teilnahmen",
        )?;

        let frames_dropped_total = IntCounter::with_opts(Opts::new(
            "treffpunkt_frames_dropped_total",
            "Wegen voller Sende-Queue verworfene Pushes",
        ))?;
        registry.register(Box::new(frames_dropped_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("treffpunkt_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "treffpunkt_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            connections_active,
            connections_authenticated,
            rooms_active,
            voice_participations,
            frames_dropped_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Uebernimmt eine Momentaufnahme in die Gauges
    pub fn stand_uebernehmen(&self, stand: EchtzeitStand) {
        self.connections_active.set(stand.verbindungen as i64);
        self.connections_authenticated
            .set(stand.authentifiziert as i64);
        self.rooms_active.set(stand.raeume as i64);
        self.voice_participations.set(stand.voice_teilnahmen as i64);

        // Counter koennen nur wachsen: Differenz zum letzten Stand addieren
        let bisher = self.frames_dropped_total.get();
        if stand.verworfen > bisher {
            self.frames_dropped_total.inc_by(stand.verworfen - bisher);
        }
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: TreffpunktMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<TreffpunktMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(fehler = %err, "Metriken-Export fehlgeschlagen");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
