use prometheus::{Counter, Registry};

use crate::error::WebhookError;

/// Delivery engine metrics (C9), named and shaped after `task_queue`'s
/// [`task_queue::metrics::PoolMetrics`].
#[derive(Clone)]
pub struct WebhookMetrics {
	pub deliveries_attempted: Counter,
	pub deliveries_succeeded: Counter,
	pub deliveries_failed: Counter,
	pub deliveries_abandoned: Counter,
}

impl WebhookMetrics {
	/// # Errors
	/// Returns [`WebhookError::Prometheus`] if registration on `registry`
	/// fails (e.g. a name collision from registering twice on the same
	/// registry).
	pub fn register(registry: &Registry) -> Result<Self, WebhookError> {
		let deliveries_attempted = Counter::new("webhook_deliveries_attempted_total", "Delivery attempts made")?;
		let deliveries_succeeded = Counter::new("webhook_deliveries_succeeded_total", "Deliveries that reached a 2xx response")?;
		let deliveries_failed = Counter::new("webhook_deliveries_failed_total", "Deliveries that exhausted their attempts")?;
		let deliveries_abandoned = Counter::new("webhook_deliveries_abandoned_total", "Deliveries abandoned on shutdown")?;

		registry.register(Box::new(deliveries_attempted.clone()))?;
		registry.register(Box::new(deliveries_succeeded.clone()))?;
		registry.register(Box::new(deliveries_failed.clone()))?;
		registry.register(Box::new(deliveries_abandoned.clone()))?;

		Ok(Self {
			deliveries_attempted,
			deliveries_succeeded,
			deliveries_failed,
			deliveries_abandoned,
		})
	}
}
