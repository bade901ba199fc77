//! # treffpunkt-observability
//!
//! Observability-Crate fuer Treffpunkt:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, EchtzeitStand, TreffpunktMetrics};
pub use middleware::request_timing_layer;

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;

/// Baut den Observability-Router (Metriken + Health)
pub fn observability_router(metriken: TreffpunktMetrics, health: HealthState) -> Router {
    Router::new()
        .merge(metrics_router(metriken.clone()))
        .merge(health_router(health))
        .layer(axum::middleware::from_fn_with_state(
            metriken,
            middleware::timing_middleware,
        ))
        .layer(request_timing_layer())
}

/// Startet den Observability-HTTP-Server
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: TreffpunktMetrics,
    health: HealthState,
) -> Result<()> {
    let app = observability_router(metriken, health);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_liefert_health_und_metrics() {
        let metriken = TreffpunktMetrics::neu().unwrap();
        let app = observability_router(metriken.clone(), HealthState::neu());

        let antwort = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let antwort = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        // Middleware hat die erste Anfrage gezaehlt
        let wert = metriken
            .http_requests_total
            .with_label_values(&["GET", "/health", "200"])
            .get();
        assert_eq!(wert, 1);
    }
}
