use std::sync::Arc;
use std::time::Duration;

use media_core::model::{DeliveryStatus, Webhook, WebhookDelivery};
use media_core::ports::Store;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::WebhookConfig;
use crate::metrics::WebhookMetrics;
use crate::signing::sign;

/// Runs one delivery to completion: attempts the POST up to
/// `config.max_attempts` times with exponential backoff between failures,
/// abandoning early if `shutdown` fires (spec.md §4.8, §9: "a task per
/// delivery, which sleeps between attempts on a cancellable delay").
pub(crate) async fn run(http: reqwest::Client, store: Arc<dyn Store>, shutdown: CancellationToken, config: WebhookConfig, metrics: WebhookMetrics, webhook: Webhook, mut delivery: WebhookDelivery) {
	loop {
		if shutdown.is_cancelled() {
			abandon(&store, delivery).await;
			metrics.deliveries_abandoned.inc();
			return;
		}

		delivery.attempts += 1;
		metrics.deliveries_attempted.inc();

		let body = serde_json::to_vec(&delivery.payload).unwrap_or_default();
		let signature = sign(&webhook.secret, &body);
		let timestamp = chrono::Utc::now().timestamp();

		let request = http
			.post(&webhook.url)
			.header("Content-Type", "application/json")
			.header("X-Webhook-Event", &delivery.event)
			.header("X-Webhook-Delivery", delivery.id.to_string())
			.header("X-Webhook-Timestamp", timestamp.to_string())
			.header("X-Webhook-Signature", format!("sha256={signature}"))
			.timeout(config.attempt_timeout)
			.body(body);

		let outcome = tokio::select! {
			biased;
			() = shutdown_after_grace(&shutdown, config.shutdown_grace) => Err("shutdown".to_string()),
			res = request.send() => res.map_err(|e| e.to_string()),
		};

		match outcome {
			Ok(response) => {
				let status = response.status();
				delivery.response_code = Some(status.as_u16());
				if status.is_success() {
					delivery.status = DeliveryStatus::Success;
					delivery.delivered_at = Some(chrono::Utc::now());
					delivery.last_error = None;
					persist(&store, &delivery).await;
					metrics.deliveries_succeeded.inc();
					return;
				}
				delivery.last_error = Some(format!("http {status}"));
			}
			Err(message) => {
				delivery.last_error = Some(message);
			}
		}

		if delivery.attempts >= config.max_attempts {
			delivery.status = DeliveryStatus::Failed;
			persist(&store, &delivery).await;
			metrics.deliveries_failed.inc();
			return;
		}

		persist(&store, &delivery).await;

		let backoff = backoff_for(config.base_backoff, delivery.attempts);
		tokio::select! {
			biased;
			() = shutdown.cancelled() => {
				abandon(&store, delivery).await;
				metrics.deliveries_abandoned.inc();
				return;
			}
			() = tokio::time::sleep(backoff) => {}
		}
	}
}

/// Marks a delivery `failed` with `last_error = "shutdown"` and persists it.
/// Used both when the engine is already shut down before this delivery's
/// task acquires a permit, and when shutdown interrupts an in-progress
/// backoff wait.
pub(crate) async fn abandon(store: &Arc<dyn Store>, mut delivery: WebhookDelivery) {
	delivery.status = DeliveryStatus::Failed;
	delivery.last_error = Some("shutdown".to_string());
	persist(store, &delivery).await;
}

async fn persist(store: &Arc<dyn Store>, delivery: &WebhookDelivery) {
	if let Err(error) = store.update_webhook_delivery(&CancellationToken::new(), delivery).await {
		tracing::error!(%error, delivery_id = %delivery.id, "failed to persist webhook delivery state");
	}
}

/// Lets an in-flight POST finish within a bounded grace period after
/// shutdown fires, instead of cutting it the instant the token cancels
/// (spec.md §4.8: "in-flight POSTs honor a bounded grace period").
async fn shutdown_after_grace(shutdown: &CancellationToken, grace: Duration) {
	shutdown.cancelled().await;
	tokio::time::sleep(grace).await;
}

/// `base * 2^(attempt-1)` plus up to 250ms of jitter (spec.md §4.8: base 5s,
/// so attempts land at roughly 5s/10s/20s/40s).
fn backoff_for(base: Duration, attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	let scaled = base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
	let jitter_ms = rand::thread_rng().gen_range(0..250);
	scaled + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_each_attempt() {
		let base = Duration::from_secs(5);
		assert!(backoff_for(base, 1) >= base);
		assert!(backoff_for(base, 1) < base + Duration::from_millis(250));
		assert!(backoff_for(base, 2) >= base * 2);
		assert!(backoff_for(base, 3) >= base * 4);
	}
}
