use std::time::Duration;

/// Webhook delivery engine configuration (spec.md §4.8: 10s per-attempt
/// timeout, 5 max attempts, base backoff 5s doubling each attempt).
#[derive(Debug, Clone)]
pub struct WebhookConfig {
	pub delivery_concurrency: usize,
	pub attempt_timeout: Duration,
	pub max_attempts: u32,
	pub base_backoff: Duration,
	pub shutdown_grace: Duration,
}

impl WebhookConfig {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[cfg(test)]
	#[must_use]
	pub fn test() -> Self {
		Self {
			delivery_concurrency: 4,
			attempt_timeout: Duration::from_millis(300),
			max_attempts: 5,
			base_backoff: Duration::from_millis(20),
			shutdown_grace: Duration::from_millis(50),
		}
	}
}

impl Default for WebhookConfig {
	fn default() -> Self {
		Self {
			delivery_concurrency: 10,
			attempt_timeout: Duration::from_secs(10),
			max_attempts: 5,
			base_backoff: Duration::from_secs(5),
			shutdown_grace: Duration::from_secs(5),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_matches_spec_constants() {
		let config = WebhookConfig::default();
		assert_eq!(config.max_attempts, 5);
		assert_eq!(config.base_backoff, Duration::from_secs(5));
		assert_eq!(config.attempt_timeout, Duration::from_secs(10));
	}
}
