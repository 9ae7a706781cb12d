use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	status: &'static str,
	version: &'static str,
}

/// `GET /healthz` (spec.md §6). Liveness only — it never touches the store
/// or any outbound port, so it stays up even while the database or an
/// external dependency is unreachable.
#[axum::debug_handler]
#[tracing::instrument(name = "health")]
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
	(StatusCode::OK, Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") }))
}

/// `GET /metrics` in Prometheus text exposition format.
pub async fn metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
	let encoder = TextEncoder::new();
	let metric_families = registry.gather();
	let mut buffer = Vec::new();
	if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
		tracing::error!(%error, "failed to encode metrics");
		return (StatusCode::INTERNAL_SERVER_ERROR, [(header::CONTENT_TYPE, "text/plain")], Vec::new());
	}
	(StatusCode::OK, [(header::CONTENT_TYPE, encoder.format_type())], buffer)
}
