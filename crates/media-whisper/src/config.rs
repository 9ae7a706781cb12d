use std::time::Duration;

/// Whisper Port configuration (spec.md §6: `whisper_credential`). Absent
/// credential means [`crate::client.WhisperClient::is_configured`] returns
/// `false`, the contract callers must honor by degrading rather than
/// failing outright (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct WhisperConfig {
	pub endpoint: String,
	pub credential: Option<String>,
	pub timeout: Duration,
}

impl WhisperConfig {
	#[must_use]
	pub fn new(endpoint: impl Into<String>, credential: Option<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			credential,
			timeout: Duration::from_secs(600),
		}
	}

	#[must_use]
	pub const fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}
