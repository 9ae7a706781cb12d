use std::time::Duration;

/// Extractor Port configuration (spec.md §6: `extractor_binary_path`,
/// `extractor_proxy`). `binary_path` absent at startup is a hard error per
/// spec.md §6's table — callers construct [`ExtractorConfig`] only after
/// confirming the binary is configured; this crate does not itself decide
/// what "absent" means for the surrounding service.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
	pub binary_path: String,
	pub proxy: Option<String>,
	pub timeout: Duration,
}

impl ExtractorConfig {
	#[must_use]
	pub fn new(binary_path: impl Into<String>) -> Self {
		Self {
			binary_path: binary_path.into(),
			proxy: None,
			timeout: Duration::from_secs(180),
		}
	}

	#[must_use]
	pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
		self.proxy = Some(proxy.into());
		self
	}

	#[must_use]
	pub const fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}
