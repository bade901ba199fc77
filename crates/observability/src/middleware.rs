//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage, loggt sie strukturiert und
//! traegt sie in die HTTP-Metriken ein.

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

use crate::metrics::TreffpunktMetrics;

/// TraceLayer fuer HTTP-Spans
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<TreffpunktMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16().to_string();

    metriken
        .http_requests_total
        .with_label_values(&[&methode, &pfad, &status])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[&methode, &pfad])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = %status,
        duration_ms = dauer.as_millis() as u64,
        "HTTP-Anfrage abgeschlossen"
    );

    response
}
