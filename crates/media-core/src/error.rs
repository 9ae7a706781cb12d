use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

/// Error taxonomy for the whole service (spec.md §7). Every kind maps to
/// exactly one HTTP status; library crates keep their own narrow `thiserror`
/// enums (`task_queue::error::KnownError`-style) and are folded into this one
/// only at the handler boundary, the way `nest::http::error::Error` folds in
/// `sqlx::Error`.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
	#[error("{0}")]
	Validation(String),

	#[error("not found")]
	NotFound,

	#[error("{0}")]
	Conflict(String),

	#[error("authentication required")]
	Unauthorized,

	#[error("rate limit exceeded")]
	RateLimited,

	#[error("queue_full")]
	QueueFull,

	#[error("service unavailable: {0}")]
	Unconfigured(String),

	#[error("internal_error")]
	Internal(String),

	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl ServiceError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::Validation(_) => StatusCode::BAD_REQUEST,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
			Self::QueueFull | Self::Unconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Internal(_) | Self::Sqlx(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

#[derive(Serialize)]
struct ErrorBody {
	error: String,
}

impl IntoResponse for ServiceError {
	fn into_response(self) -> Response<Body> {
		match &self {
			Self::Sqlx(e) => tracing::error!(error = %e, "sqlx error"),
			Self::Anyhow(e) => tracing::error!(error = %e, "internal error"),
			Self::Internal(msg) => tracing::error!(%msg, "internal error"),
			_ => {}
		}

		let body = ErrorBody { error: self.to_string() };
		(self.status_code(), Json(body)).into_response()
	}
}

pub type ServiceResult<T> = Result<T, ServiceError>;
