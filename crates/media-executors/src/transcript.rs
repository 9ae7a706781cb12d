use std::sync::Arc;

use media_core::model::{word_count, JobStatus, Transcript};
use media_core::ports::{Extractor, Store, TranscriptUpdate, WebhookPublisher};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::batch;

/// Runs the transcript extraction job (C7, spec.md §4.2 + §4.6): extracts,
/// persists the outcome, publishes the matching event, then — if the
/// transcript belongs to a batch — recounts the batch.
pub(crate) async fn run(store: &Arc<dyn Store>, extractor: &Arc<dyn Extractor>, webhooks: &Arc<dyn WebhookPublisher>, ct: &CancellationToken, transcript_id: Uuid) {
	let transcript = match store.get_transcript(ct, transcript_id).await {
		Ok(Some(transcript)) => transcript,
		Ok(None) => {
			tracing::error!(%transcript_id, "transcript extraction job referenced a missing record");
			return;
		}
		Err(error) => {
			tracing::error!(%error, %transcript_id, "failed to load transcript before extraction");
			return;
		}
	};

	if transcript.status.is_terminal() {
		tracing::debug!(%transcript_id, status = ?transcript.status, "transcript already terminal, skipping redelivered job");
		return;
	}

	if let Err(error) = store
		.update_transcript(ct, transcript_id, TranscriptUpdate { status: Some(JobStatus::Processing), ..Default::default() })
		.await
	{
		tracing::error!(%error, %transcript_id, "failed to mark transcript processing");
		return;
	}

	let update = match extractor.extract(ct, &transcript.youtube_url).await {
		Ok(extracted) => TranscriptUpdate {
			status: Some(JobStatus::Completed),
			title: extracted.title,
			channel_name: extracted.channel_name,
			duration_seconds: extracted.duration_seconds,
			language: Some(extracted.language),
			word_count: Some(word_count(&extracted.text)),
			text: Some(extracted.text),
			error_message: Some(String::new()),
		},
		Err(error) => {
			tracing::warn!(%error, %transcript_id, "transcript extraction failed");
			TranscriptUpdate {
				status: Some(JobStatus::Failed),
				error_message: Some(error.to_string()),
				..Default::default()
			}
		}
	};

	let succeeded = matches!(update.status, Some(JobStatus::Completed));

	let updated = match store.update_transcript(ct, transcript_id, update).await {
		Ok(updated) => updated,
		Err(error) => {
			tracing::error!(%error, %transcript_id, "failed to persist transcript extraction outcome");
			return;
		}
	};

	let event = if succeeded { "transcript.completed" } else { "transcript.failed" };
	webhooks.publish_event(event, transcript_payload(&updated)).await;

	if let Some(batch_id) = updated.batch_id {
		batch::recount_and_notify(store, webhooks, ct, batch_id).await;
	}
}

fn transcript_payload(transcript: &Transcript) -> serde_json::Value {
	json!({
		"id": transcript.id,
		"youtube_id": transcript.youtube_id,
		"status": transcript.status,
		"title": transcript.title,
		"error_message": transcript.error_message,
	})
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::Utc;
	use media_core::model::JobStatus;
	use media_core::ports::{ExtractError, ExtractedTranscript};
	use tokio_util::sync::CancellationToken;
	use uuid::Uuid;

	use super::run;
	use crate::test_support::{FakeExtractor, FakeStore, FakeWebhookPublisher};

	fn pending_transcript(id: Uuid, batch_id: Option<Uuid>) -> media_core::model::Transcript {
		media_core::model::Transcript {
			id,
			youtube_url: "https://youtube.com/watch?v=abc123".to_string(),
			youtube_id: "abc123".to_string(),
			title: None,
			channel_name: None,
			duration_seconds: None,
			language: None,
			text: None,
			word_count: None,
			status: JobStatus::Pending,
			error_message: String::new(),
			batch_id,
			owner_key_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn extraction_success_completes_and_fills_word_count() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		fake_store.insert_transcript(pending_transcript(id, None));

		let extractor: Arc<dyn media_core::ports::Extractor> = Arc::new(FakeExtractor::ok(ExtractedTranscript {
			title: Some("A Talk".to_string()),
			channel_name: Some("Some Channel".to_string()),
			duration_seconds: Some(600),
			language: "en".to_string(),
			text: "four little words".to_string(),
		}));
		let webhooks_fake = Arc::new(FakeWebhookPublisher::new());
		let webhooks: Arc<dyn media_core::ports::WebhookPublisher> = webhooks_fake.clone();
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &extractor, &webhooks, &CancellationToken::new(), id).await;

		let saved = fake_store.transcript(id);
		assert_eq!(saved.status, JobStatus::Completed);
		assert_eq!(saved.word_count, Some(3));
		assert_eq!(saved.title.as_deref(), Some("A Talk"));

		let events = webhooks_fake.events();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].0, "transcript.completed");
	}

	#[tokio::test]
	async fn extraction_failure_is_persisted_with_the_error_reason() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		fake_store.insert_transcript(pending_transcript(id, None));

		let extractor: Arc<dyn media_core::ports::Extractor> = Arc::new(FakeExtractor::err(ExtractError::NoCaptions));
		let webhooks_fake = Arc::new(FakeWebhookPublisher::new());
		let webhooks: Arc<dyn media_core::ports::WebhookPublisher> = webhooks_fake.clone();
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &extractor, &webhooks, &CancellationToken::new(), id).await;

		let saved = fake_store.transcript(id);
		assert_eq!(saved.status, JobStatus::Failed);
		assert_eq!(saved.error_message, "no_captions");

		let events = webhooks_fake.events();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].0, "transcript.failed");
	}

	#[tokio::test]
	async fn already_terminal_transcript_is_skipped_on_redelivery() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		let mut transcript = pending_transcript(id, None);
		transcript.status = JobStatus::Completed;
		transcript.text = Some("already done".to_string());
		fake_store.insert_transcript(transcript);

		// An extractor that would panic if invoked proves the idempotency check
		// short-circuits before any extraction call.
		let extractor: Arc<dyn media_core::ports::Extractor> = Arc::new(FakeExtractor::err(ExtractError::Cancelled));
		let webhooks_fake = Arc::new(FakeWebhookPublisher::new());
		let webhooks: Arc<dyn media_core::ports::WebhookPublisher> = webhooks_fake.clone();
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &extractor, &webhooks, &CancellationToken::new(), id).await;

		assert!(webhooks_fake.events().is_empty());
		assert_eq!(fake_store.transcript(id).text.as_deref(), Some("already done"));
	}
}
