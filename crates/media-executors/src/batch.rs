use std::sync::Arc;

use media_core::model::BatchStatus;
use media_core::ports::{Store, WebhookPublisher};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Recount a batch after one of its children settles, and publish
/// `batch.completed` exactly once, at the transition into a terminal state.
///
/// The pre/post diff has to happen here rather than inside `update_batch_counts`:
/// the store only ever sees one snapshot per call, but firing the event once
/// requires knowing whether the batch was still `processing` immediately
/// before this child's update.
pub(crate) async fn recount_and_notify(store: &Arc<dyn Store>, webhooks: &Arc<dyn WebhookPublisher>, ct: &CancellationToken, batch_id: Uuid) {
	let was_processing = match store.get_batch(ct, batch_id).await {
		Ok(Some(batch)) => batch.status == BatchStatus::Processing,
		Ok(None) => {
			tracing::warn!(%batch_id, "batch referenced by a transcript was not found");
			return;
		}
		Err(error) => {
			tracing::error!(%error, %batch_id, "failed to load batch before recount");
			return;
		}
	};

	let counts = match store.update_batch_counts(ct, batch_id).await {
		Ok(counts) => counts,
		Err(error) => {
			tracing::error!(%error, %batch_id, "failed to recount batch");
			return;
		}
	};

	if was_processing && counts.reached_terminal {
		webhooks
			.publish_event(
				"batch.completed",
				json!({
					"batch_id": batch_id,
					"total_count": counts.total,
					"completed_count": counts.completed,
					"failed_count": counts.failed,
				}),
			)
			.await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::Utc;
	use media_core::model::{Batch, BatchStatus, JobStatus, Transcript};
	use media_core::ports::{Store, WebhookPublisher};
	use tokio_util::sync::CancellationToken;
	use uuid::Uuid;

	use super::recount_and_notify;
	use crate::test_support::{FakeStore, FakeWebhookPublisher};

	fn transcript(batch_id: Uuid, status: JobStatus) -> Transcript {
		Transcript {
			id: Uuid::new_v4(),
			youtube_url: "https://youtube.com/watch?v=abc".to_string(),
			youtube_id: "abc".to_string(),
			title: None,
			channel_name: None,
			duration_seconds: None,
			language: None,
			text: None,
			word_count: None,
			status,
			error_message: String::new(),
			batch_id: Some(batch_id),
			owner_key_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn new_batch(id: Uuid, total: i64) -> Batch {
		Batch {
			id,
			status: BatchStatus::Processing,
			total_count: total,
			completed_count: 0,
			failed_count: 0,
			owner_key_id: None,
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn fires_batch_completed_only_on_the_transition_into_terminal() {
		let fake_store = Arc::new(FakeStore::new());
		let batch_id = Uuid::new_v4();
		fake_store.insert_batch(new_batch(batch_id, 2));

		let first = transcript(batch_id, JobStatus::Completed);
		let second = transcript(batch_id, JobStatus::Pending);
		fake_store.insert_transcript(first.clone());
		fake_store.insert_transcript(second.clone());

		let store: Arc<dyn Store> = fake_store.clone();
		let webhooks_fake = Arc::new(FakeWebhookPublisher::new());
		let webhooks: Arc<dyn WebhookPublisher> = webhooks_fake.clone();
		let ct = CancellationToken::new();

		recount_and_notify(&store, &webhooks, &ct, batch_id).await;
		assert!(webhooks_fake.events().is_empty(), "batch still has a pending child, should not finalize yet");

		let mut second_done = second;
		second_done.status = JobStatus::Completed;
		fake_store.insert_transcript(second_done);

		recount_and_notify(&store, &webhooks, &ct, batch_id).await;
		let events = webhooks_fake.events();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].0, "batch.completed");
		assert_eq!(fake_store.batch(batch_id).status, BatchStatus::Completed);
	}

	#[tokio::test]
	async fn does_not_refire_once_already_terminal() {
		let fake_store = Arc::new(FakeStore::new());
		let batch_id = Uuid::new_v4();
		let mut batch = new_batch(batch_id, 1);
		batch.status = BatchStatus::Completed;
		fake_store.insert_batch(batch);
		fake_store.insert_transcript(transcript(batch_id, JobStatus::Completed));

		let store: Arc<dyn Store> = fake_store.clone();
		let webhooks_fake = Arc::new(FakeWebhookPublisher::new());
		let webhooks: Arc<dyn WebhookPublisher> = webhooks_fake.clone();
		let ct = CancellationToken::new();

		recount_and_notify(&store, &webhooks, &ct, batch_id).await;
		assert!(webhooks_fake.events().is_empty(), "already-terminal batch must not refire on later redeliveries");
	}
}
