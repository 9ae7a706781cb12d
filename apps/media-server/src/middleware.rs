use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use media_core::ServiceError;
use some_services::rate_limiter::{KeyedRateLimiter, RateLimitOutcome};
use uuid::Uuid;

/// Per-API-key token bucket (spec.md §7: "rate-limited... 429 with
/// `X-RateLimit-*` headers"), fanned out over [`KeyedRateLimiter`] instead of
/// the teacher's single global bucket, since each caller gets its own bucket
/// here. Callers with no `X-Api-Key` header share the nil-uuid bucket.
pub async fn rate_limit_middleware(State(limiter): State<Arc<KeyedRateLimiter>>, request: Request<Body>, next: Next) -> Response {
	let key = request
		.headers()
		.get("x-api-key")
		.and_then(|v| v.to_str().ok())
		.and_then(|s| Uuid::parse_str(s).ok())
		.unwrap_or(Uuid::nil());

	match limiter.allow(key).await {
		Ok(RateLimitOutcome::Allowed) => {
			let remaining = limiter.remaining(key).await;
			let mut response = next.run(request).await;
			let headers = response.headers_mut();
			headers.insert("x-ratelimit-limit", limiter.limit().into());
			headers.insert("x-ratelimit-remaining", remaining.into());
			response
		}
		Ok(RateLimitOutcome::Limited) => ServiceError::RateLimited.into_response(),
		Err(error) => {
			tracing::error!(%error, "rate limiter clock error");
			ServiceError::Internal("rate limiter unavailable".to_string()).into_response()
		}
	}
}
