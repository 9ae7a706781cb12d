//! Dispatch table and the three job executors it routes to (C7, spec.md
//! §4.6). `task-queue` owns the queue and the worker loop; this crate owns
//! everything that happens once a worker has a job in hand.
mod audio;
mod batch;
mod summary;
mod transcript;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use async_trait::async_trait;
use media_core::model::{JobStatus, SummaryStatus};
use media_core::ports::{AudioSummaryUpdate, AudioUpdate, BlobStore, Extractor, Store, Summarizer, TranscriptUpdate, WebhookPublisher, Whisper};
use media_core::{Job, JobKind};
use task_queue::dispatch::JobHandler;
use tokio_util::sync::CancellationToken;

/// Binds the four outbound ports an executor can call into a single
/// `JobHandler` the worker pool can hold as `Arc<dyn JobHandler>`. Mirrors
/// the way `paulgsc_server`'s request handlers hold a bag of adapter
/// `Arc`s rather than one monolithic service struct.
pub struct Dispatcher {
	store: Arc<dyn Store>,
	extractor: Arc<dyn Extractor>,
	whisper: Arc<dyn Whisper>,
	summarizer: Arc<dyn Summarizer>,
	blobs: Arc<dyn BlobStore>,
	webhooks: Arc<dyn WebhookPublisher>,
}

impl Dispatcher {
	#[must_use]
	pub fn new(store: Arc<dyn Store>, extractor: Arc<dyn Extractor>, whisper: Arc<dyn Whisper>, summarizer: Arc<dyn Summarizer>, blobs: Arc<dyn BlobStore>, webhooks: Arc<dyn WebhookPublisher>) -> Self {
		Self { store, extractor, whisper, summarizer, blobs, webhooks }
	}
}

#[async_trait]
impl JobHandler for Dispatcher {
	async fn handle(&self, job: Job, ct: CancellationToken) {
		match job.kind {
			JobKind::TranscriptExtraction { transcript_id } => {
				transcript::run(&self.store, &self.extractor, &self.webhooks, &ct, transcript_id).await;
			}
			JobKind::AudioTranscription { audio_id, with_summary, content_type } => {
				audio::run(&self.store, &self.blobs, &self.whisper, &self.summarizer, &self.webhooks, &ct, audio_id, with_summary, content_type).await;
			}
			JobKind::SummaryGeneration { transcript_id, summary_id: _, length, style, model_override } => {
				summary::run(&self.store, &self.summarizer, &ct, transcript_id, length, style, model_override).await;
			}
			JobKind::AudioSummaryGeneration { audio_id, content_type, length, style, model_override } => {
				audio::run_summary(&self.store, &self.summarizer, &ct, audio_id, content_type, length, style, model_override).await;
			}
		}
	}

	/// Best-effort: the worker pool only calls this after `handle` has
	/// already panicked, so every write here uses a fresh, un-cancelled
	/// token and swallows its own errors rather than risk a second panic
	/// (spec.md §4.5).
	async fn mark_internal_error(&self, job: &Job) {
		let ct = CancellationToken::new();
		match &job.kind {
			JobKind::TranscriptExtraction { transcript_id } => {
				let update = TranscriptUpdate { status: Some(JobStatus::Failed), error_message: Some("internal_error".to_string()), ..Default::default() };
				if let Err(error) = self.store.update_transcript(&ct, *transcript_id, update).await {
					tracing::error!(%error, transcript_id = %transcript_id, "failed to mark transcript failed after executor panic");
				}
			}
			JobKind::AudioTranscription { audio_id, .. } => {
				let update = AudioUpdate { status: Some(JobStatus::Failed), error_message: Some("internal_error".to_string()), ..Default::default() };
				if let Err(error) = self.store.update_audio_transcription(&ct, *audio_id, update).await {
					tracing::error!(%error, audio_id = %audio_id, "failed to mark audio transcription failed after executor panic");
				}
			}
			JobKind::SummaryGeneration { .. } => {
				// No row exists to mark failed yet — a summary is created only
				// on success (spec.md §4.4). The panic itself is already logged
				// by the worker pool; nothing further to persist here.
			}
			JobKind::AudioSummaryGeneration { audio_id, .. } => {
				let update = AudioSummaryUpdate { summary_status: SummaryStatus::Failed, ..Default::default() };
				if let Err(error) = self.store.update_audio_summary(&ct, *audio_id, update).await {
					tracing::error!(%error, audio_id = %audio_id, "failed to mark audio summary failed after executor panic");
				}
			}
		}
	}
}
