use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use media_core::ServiceError;
use uuid::Uuid;

const API_KEY_HEADER: &str = "x-api-key";

/// The API key doubles as the caller's `owner_key_id` — there is no separate
/// key-to-owner lookup table in [`media_core::ports::Store`], so the header
/// value is parsed directly as the `Uuid` every owner-scoped record and
/// webhook subscription is stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKey(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
	S: Send + Sync,
{
	type Rejection = ServiceError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let header = parts.headers.get(API_KEY_HEADER).ok_or(ServiceError::Unauthorized)?;
		let raw = header.to_str().map_err(|_| ServiceError::Unauthorized)?;
		let id = Uuid::parse_str(raw).map_err(|_| ServiceError::Unauthorized)?;
		Ok(Self(id))
	}
}

/// Same header, but absent/invalid just means "anonymous" rather than a
/// rejection — used by read endpoints that don't require a caller identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalApiKey(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalApiKey
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let id = parts.headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()).and_then(|s| Uuid::parse_str(s).ok());
		Ok(Self(id))
	}
}

/// Owner-override check (spec.md GLOSSARY): a configured set of key ids
/// allowed to bypass `TrySubmit` rejection via blocking `Submit`.
#[must_use]
pub fn is_owner_override(config: &crate::config::Config, key: Uuid) -> bool {
	config.owner_override_keys.contains(&key)
}
