use std::sync::Arc;

use axum::extract::FromRef;
use media_core::ports::{BlobStore, Extractor, PdfExtractor, Store, Summarizer, Whisper};
use prometheus::Registry;
use some_services::rate_limiter::KeyedRateLimiter;
use task_queue::JobQueue;
use tokio_util::sync::CancellationToken;
use webhooks::WebhookEngine;

use crate::config::Config;

/// Core: stable collaborators that exist for the life of the process
/// (mirrors `file_host::CoreContext`).
#[derive(Clone)]
pub struct CoreContext {
	pub config: Arc<Config>,
	pub cancel_token: CancellationToken,
	pub store: Arc<dyn Store>,
}

/// External: the four outbound ports a handler might call directly
/// (uploads synchronously via `PdfExtractor`, or indirectly by submitting a
/// job that will eventually reach `Extractor`/`Whisper`/`Summarizer`).
#[derive(Clone)]
pub struct ExternalApis {
	pub extractor: Arc<dyn Extractor>,
	pub whisper: Arc<dyn Whisper>,
	pub summarizer: Arc<dyn Summarizer>,
	pub pdf: Arc<dyn PdfExtractor>,
	pub blobs: Arc<dyn BlobStore>,
}

/// Jobs: the submission side of C5/C6 plus the per-key rate limiter, both of
/// which every mutating handler touches.
#[derive(Clone)]
pub struct JobsContext {
	pub queue: Arc<JobQueue>,
	pub rate_limiter: Arc<KeyedRateLimiter>,
}

#[derive(Clone)]
pub struct AppState {
	pub core: CoreContext,
	pub external: ExternalApis,
	pub jobs: JobsContext,
	pub webhooks: Arc<WebhookEngine>,
	pub registry: Arc<Registry>,
}

impl AppState {
	#[allow(clippy::too_many_arguments)]
	#[must_use]
	pub fn new(
		config: Arc<Config>,
		cancel_token: CancellationToken,
		store: Arc<dyn Store>,
		extractor: Arc<dyn Extractor>,
		whisper: Arc<dyn Whisper>,
		summarizer: Arc<dyn Summarizer>,
		pdf: Arc<dyn PdfExtractor>,
		blobs: Arc<dyn BlobStore>,
		queue: Arc<JobQueue>,
		rate_limiter: Arc<KeyedRateLimiter>,
		webhooks: Arc<WebhookEngine>,
		registry: Arc<Registry>,
	) -> Self {
		Self {
			core: CoreContext { config, cancel_token, store },
			external: ExternalApis { extractor, whisper, summarizer, pdf, blobs },
			jobs: JobsContext { queue, rate_limiter },
			webhooks,
			registry,
		}
	}
}

impl FromRef<AppState> for Arc<Config> {
	fn from_ref(state: &AppState) -> Self {
		state.core.config.clone()
	}
}

impl FromRef<AppState> for CancellationToken {
	fn from_ref(state: &AppState) -> Self {
		state.core.cancel_token.clone()
	}
}

impl FromRef<AppState> for Arc<dyn Store> {
	fn from_ref(state: &AppState) -> Self {
		state.core.store.clone()
	}
}

impl FromRef<AppState> for Arc<JobQueue> {
	fn from_ref(state: &AppState) -> Self {
		state.jobs.queue.clone()
	}
}

impl FromRef<AppState> for Arc<KeyedRateLimiter> {
	fn from_ref(state: &AppState) -> Self {
		state.jobs.rate_limiter.clone()
	}
}

impl FromRef<AppState> for Arc<dyn BlobStore> {
	fn from_ref(state: &AppState) -> Self {
		state.external.blobs.clone()
	}
}

impl FromRef<AppState> for Arc<dyn PdfExtractor> {
	fn from_ref(state: &AppState) -> Self {
		state.external.pdf.clone()
	}
}

impl FromRef<AppState> for Arc<WebhookEngine> {
	fn from_ref(state: &AppState) -> Self {
		state.webhooks.clone()
	}
}

impl FromRef<AppState> for Arc<Registry> {
	fn from_ref(state: &AppState) -> Self {
		state.registry.clone()
	}
}

#[must_use]
pub fn build_registry() -> Registry {
	Registry::new()
}
