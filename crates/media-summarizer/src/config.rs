use std::time::Duration;

/// Summarizer Port configuration (spec.md §6: `summarizer_credential`,
/// `summarizer_default_model`). Absent credential means endpoints depending
/// on this port answer 503 (spec.md §6) — enforced by callers checking
/// [`crate::client::SummarizerClient::is_configured`], not by this type.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
	pub endpoint: String,
	pub credential: Option<String>,
	pub default_model: String,
	pub timeout: Duration,
}

impl SummarizerConfig {
	#[must_use]
	pub fn new(endpoint: impl Into<String>, credential: Option<String>, default_model: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			credential,
			default_model: default_model.into(),
			timeout: Duration::from_secs(120),
		}
	}

	#[must_use]
	pub const fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}
