use crate::state::PortalState;
use crate::storage::UploadKind;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{debug, info};

/// Health probe for the edge device
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "ok": true, "message": "pong" })))
}

/// Single ingest endpoint for the edge device: text notifications, photo
/// uploads and anything else it decides to send, dispatched on Content-Type.
pub async fn check(
    State(state): State<PortalState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "empty body" })),
        );
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("text/plain") {
        telemetry::metrics::PORTAL_UPLOADS
            .with_label_values(&["text"])
            .inc();
        let text = String::from_utf8_lossy(&body);
        // Advisory only: the hall-sensor notification never opens the gate
        if text.trim() == state.hall_sensor_phrase() {
            info!("hall sensor tripped, awaiting photo for plate check");
        } else {
            debug!("text notification: {}", text);
        }
        return (StatusCode::OK, Json(json!({ "ok": true, "type": "text" })));
    }

    if content_type.starts_with("image/jpeg") {
        telemetry::metrics::PORTAL_UPLOADS
            .with_label_values(&["photo"])
            .inc();
        let file = state.store().save(UploadKind::Photo, &body).await;
        let decision = state.decide(body.to_vec()).await;
        return (
            StatusCode::OK,
            Json(json!({
                "ok": decision.authorized,
                "number": decision.number,
                "candidates": decision.candidates,
                "file": file,
            })),
        );
    }

    telemetry::metrics::PORTAL_UPLOADS
        .with_label_values(&["raw"])
        .inc();
    let file = state.store().save(UploadKind::Raw, &body).await;
    (
        StatusCode::OK,
        Json(json!({ "ok": true, "type": "unknown", "file": file })),
    )
}

/// Poll endpoint for the gate actuator. Legacy plain-text contract:
/// exactly "true" or "false", and "true" consumes the latch.
pub async fn poll_result(State(state): State<PortalState>) -> &'static str {
    if state.poll_gate() {
        "true"
    } else {
        "false"
    }
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> impl IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = telemetry::metrics::REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s.into_response(),
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to convert metrics",
            )
                .into_response()
        }
    }
}
