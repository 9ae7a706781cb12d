use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use media_core::model::{Webhook, WebhookDelivery};
use media_core::ports::{Store, WebhookPublisher};
use prometheus::Registry;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::WebhookConfig;
use crate::delivery;
use crate::error::WebhookError;
use crate::metrics::WebhookMetrics;

/// Webhook delivery engine (C9, spec.md §4.8). Holds no queue of its own:
/// `publish_event` persists one [`WebhookDelivery`] row per active
/// subscriber and spawns one task per delivery, bounded by a semaphore sized
/// to `config.delivery_concurrency` — the Rust rendering of "a task per
/// delivery that sleeps between attempts on a cancellable delay" (spec.md
/// §9's recommended design for runtimes that have that primitive).
pub struct WebhookEngine {
	store: Arc<dyn Store>,
	http: reqwest::Client,
	config: WebhookConfig,
	metrics: WebhookMetrics,
	permits: Arc<Semaphore>,
	shutdown: CancellationToken,
	accepting: Arc<AtomicBool>,
}

impl WebhookEngine {
	/// # Errors
	/// Returns [`WebhookError::Prometheus`] if metric registration on
	/// `registry` fails.
	pub fn new(store: Arc<dyn Store>, config: WebhookConfig, registry: &Registry) -> Result<Self, WebhookError> {
		let metrics = WebhookMetrics::register(registry)?;
		Ok(Self {
			store,
			http: reqwest::Client::new(),
			permits: Arc::new(Semaphore::new(config.delivery_concurrency)),
			config,
			metrics,
			shutdown: CancellationToken::new(),
			accepting: Arc::new(AtomicBool::new(true)),
		})
	}

	/// Stops accepting new events and cancels outstanding backoff waits;
	/// deliveries in the middle of a POST get `config.shutdown_grace` to
	/// finish before that connection is abandoned too.
	pub fn shutdown(&self) {
		self.accepting.store(false, Ordering::SeqCst);
		self.shutdown.cancel();
	}

	fn spawn_delivery(&self, webhook: Webhook, delivery: WebhookDelivery) {
		let http = self.http.clone();
		let store = Arc::clone(&self.store);
		let shutdown = self.shutdown.clone();
		let config = self.config.clone();
		let metrics = self.metrics.clone();
		let permits = Arc::clone(&self.permits);

		tokio::spawn(async move {
			let permit = tokio::select! {
				biased;
				() = shutdown.cancelled() => None,
				permit = permits.acquire_owned() => permit.ok(),
			};

			let Some(_permit) = permit else {
				delivery::abandon(&store, delivery).await;
				metrics.deliveries_abandoned.inc();
				return;
			};

			delivery::run(http, store, shutdown, config, metrics, webhook, delivery).await;
		});
	}
}

#[async_trait]
impl WebhookPublisher for WebhookEngine {
	/// Fire-and-forget publication (spec.md §4.8.1-3): looks up active
	/// subscribers, records one delivery row per subscriber, hands each off
	/// to its own delivery task, and returns without waiting on any HTTP
	/// call.
	async fn publish_event(&self, event: &str, payload: serde_json::Value) {
		if !self.accepting.load(Ordering::SeqCst) {
			return;
		}

		let ct = CancellationToken::new();
		let webhooks = match self.store.get_active_webhooks_for_event(&ct, event).await {
			Ok(webhooks) => webhooks,
			Err(error) => {
				tracing::error!(%error, event, "failed to look up active webhooks for event");
				return;
			}
		};

		for webhook in webhooks {
			let created = self.store.create_webhook_delivery(&ct, webhook.id, event, payload.clone()).await;
			match created {
				Ok(delivery) => self.spawn_delivery(webhook, delivery),
				Err(error) => tracing::error!(%error, event, webhook_id = %webhook.id, "failed to record webhook delivery"),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
	use std::time::Duration;

	use axum::extract::State;
	use axum::http::StatusCode;
	use axum::routing::post;
	use axum::Router;
	use media_core::ports::{ListParams, NewWebhook};
	use media_store::SqliteStore;
	use prometheus::Registry;
	use serde_json::json;
	use tokio::net::TcpListener;
	use uuid::Uuid;

	use super::*;

	async fn memory_store() -> Arc<dyn Store> {
		Arc::new(SqliteStore::connect("sqlite::memory:").await.expect("in-memory sqlite connects"))
	}

	#[derive(Clone)]
	struct ScriptedState {
		calls: Arc<AtomicUsize>,
		statuses: Arc<Vec<StatusCode>>,
	}

	async fn scripted_handler(State(state): State<ScriptedState>) -> StatusCode {
		let index = state.calls.fetch_add(1, AtomicOrdering::SeqCst);
		state.statuses.get(index).copied().unwrap_or(StatusCode::OK)
	}

	/// Starts a one-off HTTP server that answers `statuses[n]` on its nth
	/// call (and 200 for any call past the end of the script).
	async fn start_scripted_server(statuses: Vec<StatusCode>) -> (String, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let state = ScriptedState {
			calls: Arc::clone(&calls),
			statuses: Arc::new(statuses),
		};
		let app = Router::new().route("/hook", post(scripted_handler)).with_state(state);
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
		let addr = listener.local_addr().expect("local addr");
		tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});
		(format!("http://{addr}/hook"), calls)
	}

	async fn seed_webhook(store: &Arc<dyn Store>, url: String, event: &str) -> Webhook {
		store
			.create_webhook(
				&CancellationToken::new(),
				NewWebhook {
					owner_key_id: Uuid::new_v4(),
					url,
					events: vec![event.to_string()],
					secret: "s3cr3t".to_string(),
				},
			)
			.await
			.expect("create webhook")
	}

	async fn deliveries(store: &Arc<dyn Store>) -> Vec<WebhookDelivery> {
		store.list_webhook_deliveries(&CancellationToken::new(), ListParams::default()).await.expect("list deliveries")
	}

	#[tokio::test]
	async fn succeeds_on_first_attempt() {
		let store = memory_store().await;
		let (url, calls) = start_scripted_server(vec![StatusCode::OK]).await;
		seed_webhook(&store, url, "test.event").await;

		let engine = WebhookEngine::new(Arc::clone(&store), WebhookConfig::test(), &Registry::new()).unwrap();
		engine.publish_event("test.event", json!({"hello": "world"})).await;
		tokio::time::sleep(Duration::from_millis(150)).await;

		let rows = deliveries(&store).await;
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, media_core::model::DeliveryStatus::Success);
		assert_eq!(rows[0].attempts, 1);
		assert_eq!(rows[0].response_code, Some(200));
		assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retries_and_succeeds_on_the_fourth_attempt() {
		let store = memory_store().await;
		let (url, _calls) = start_scripted_server(vec![StatusCode::INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR, StatusCode::SERVICE_UNAVAILABLE, StatusCode::OK]).await;
		seed_webhook(&store, url, "test.event").await;

		let engine = WebhookEngine::new(Arc::clone(&store), WebhookConfig::test(), &Registry::new()).unwrap();
		engine.publish_event("test.event", json!({"n": 1})).await;
		tokio::time::sleep(Duration::from_millis(500)).await;

		let rows = deliveries(&store).await;
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, media_core::model::DeliveryStatus::Success);
		assert_eq!(rows[0].attempts, 4);
		assert_eq!(rows[0].response_code, Some(200));
	}

	#[tokio::test]
	async fn exhausts_attempts_and_marks_failed() {
		let store = memory_store().await;
		let (url, _calls) = start_scripted_server(vec![StatusCode::INTERNAL_SERVER_ERROR; 5]).await;
		seed_webhook(&store, url, "test.event").await;

		let engine = WebhookEngine::new(Arc::clone(&store), WebhookConfig::test(), &Registry::new()).unwrap();
		engine.publish_event("test.event", json!({})).await;
		tokio::time::sleep(Duration::from_millis(500)).await;

		let rows = deliveries(&store).await;
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, media_core::model::DeliveryStatus::Failed);
		assert_eq!(rows[0].attempts, 5);
	}

	#[tokio::test]
	async fn shutdown_abandons_a_delivery_waiting_on_backoff() {
		let store = memory_store().await;
		let (url, _calls) = start_scripted_server(vec![StatusCode::INTERNAL_SERVER_ERROR; 5]).await;
		seed_webhook(&store, url, "test.event").await;

		let mut config = WebhookConfig::test();
		config.base_backoff = Duration::from_secs(5);
		let engine = WebhookEngine::new(Arc::clone(&store), config, &Registry::new()).unwrap();
		engine.publish_event("test.event", json!({})).await;

		tokio::time::sleep(Duration::from_millis(150)).await;
		engine.shutdown();
		tokio::time::sleep(Duration::from_millis(150)).await;

		let rows = deliveries(&store).await;
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, media_core::model::DeliveryStatus::Failed);
		assert_eq!(rows[0].last_error.as_deref(), Some("shutdown"));
		assert_eq!(rows[0].attempts, 1);
	}

	#[tokio::test]
	async fn shutdown_stops_accepting_new_events() {
		let store = memory_store().await;
		let (url, calls) = start_scripted_server(vec![StatusCode::OK]).await;
		seed_webhook(&store, url, "test.event").await;

		let engine = WebhookEngine::new(Arc::clone(&store), WebhookConfig::test(), &Registry::new()).unwrap();
		engine.shutdown();
		engine.publish_event("test.event", json!({})).await;
		tokio::time::sleep(Duration::from_millis(100)).await;

		assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
		assert!(deliveries(&store).await.is_empty());
	}
}
