use std::sync::Arc;

use media_core::model::{SummaryLength, SummaryStyle};
use media_core::ports::{NewSummary, SummarizeOptions, Store, Summarizer};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Runs the summary generation job (C7, spec.md §4.4 + §4.6). Unlike the
/// other two executors, there is no status field on the owning record to
/// flip — a summary is an append-only row, and nothing is published to C9
/// either way (the event table has no row for this job type).
pub(crate) async fn run(store: &Arc<dyn Store>, summarizer: &Arc<dyn Summarizer>, ct: &CancellationToken, transcript_id: Uuid, length: SummaryLength, style: SummaryStyle, model_override: Option<String>) {
	let transcript = match store.get_transcript(ct, transcript_id).await {
		Ok(Some(transcript)) => transcript,
		Ok(None) => {
			tracing::error!(%transcript_id, "summary job referenced a missing transcript");
			return;
		}
		Err(error) => {
			tracing::error!(%error, %transcript_id, "failed to load transcript before summarizing");
			return;
		}
	};

	let Some(text) = transcript.text.filter(|_| transcript.status == media_core::model::JobStatus::Completed) else {
		// The handler rejects a summary request for a non-completed transcript
		// up front (scenario S6, 409 transcript_not_ready); reaching this job
		// with one anyway means the transcript regressed between enqueue and
		// dequeue (deleted text, or a redelivery racing a failed re-extraction).
		// There's no record to mark failed, so this is logged and dropped.
		tracing::warn!(%transcript_id, status = ?transcript.status, "summary job's transcript is not in a completed state with text, dropping");
		return;
	};

	if !summarizer.is_configured() {
		tracing::warn!(%transcript_id, "summarizer unconfigured, dropping summary job");
		return;
	}

	let options = SummarizeOptions { length, style, content_type: None, model_override };

	let result = match summarizer.summarize(ct, &text, &options).await {
		Ok(result) => result,
		Err(error) => {
			tracing::warn!(%error, %transcript_id, "summary generation failed");
			return;
		}
	};

	let new_summary = NewSummary {
		transcript_id,
		model_used: result.model_used,
		prompt_used: result.prompt_used,
		summary_text: result.summary_text,
		key_points: result.key_points,
		length,
		style,
	};

	if let Err(error) = store.create_summary(ct, new_summary).await {
		tracing::error!(%error, %transcript_id, "failed to persist generated summary");
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::Utc;
	use media_core::model::{JobStatus, SummaryLength, SummaryStyle};
	use media_core::ports::SummarizeResult;
	use tokio_util::sync::CancellationToken;
	use uuid::Uuid;

	use super::run;
	use crate::test_support::{FakeStore, FakeSummarizer};

	fn completed_transcript(id: Uuid, text: Option<&str>, status: JobStatus) -> media_core::model::Transcript {
		media_core::model::Transcript {
			id,
			youtube_url: "https://youtube.com/watch?v=abc123".to_string(),
			youtube_id: "abc123".to_string(),
			title: None,
			channel_name: None,
			duration_seconds: None,
			language: None,
			text: text.map(ToString::to_string),
			word_count: None,
			status,
			error_message: String::new(),
			batch_id: None,
			owner_key_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn generates_and_appends_a_summary_for_a_completed_transcript() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		fake_store.insert_transcript(completed_transcript(id, Some("four little words here"), JobStatus::Completed));

		let summarizer: Arc<dyn media_core::ports::Summarizer> = Arc::new(FakeSummarizer::ok(SummarizeResult {
			summary_text: "A short talk.".to_string(),
			key_points: vec!["point one".to_string()],
			action_items: Vec::new(),
			decisions: Vec::new(),
			model_used: "gpt-test".to_string(),
			prompt_used: "summarize this".to_string(),
		}));
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &summarizer, &CancellationToken::new(), id, SummaryLength::Short, SummaryStyle::Bullet, None).await;

		let saved = fake_store.summaries_for(id);
		assert_eq!(saved.len(), 1);
		assert_eq!(saved[0].summary_text, "A short talk.");
		assert_eq!(saved[0].model_used, "gpt-test");
	}

	#[tokio::test]
	async fn does_not_call_the_summarizer_for_a_still_processing_transcript() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		fake_store.insert_transcript(completed_transcript(id, None, JobStatus::Processing));

		// An unconfigured fake would not panic either way, but a configured
		// fake with no scripted outcome panics if `summarize` is ever invoked,
		// proving the completed-with-text gate runs first.
		let summarizer: Arc<dyn media_core::ports::Summarizer> = Arc::new(FakeSummarizer {
			configured: true,
			outcome: std::sync::Mutex::new(None),
		});
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &summarizer, &CancellationToken::new(), id, SummaryLength::Short, SummaryStyle::Bullet, None).await;

		assert!(fake_store.summaries_for(id).is_empty());
	}

	#[tokio::test]
	async fn unconfigured_summarizer_drops_the_job_without_writing_anything() {
		let fake_store = Arc::new(FakeStore::new());
		let id = Uuid::new_v4();
		fake_store.insert_transcript(completed_transcript(id, Some("some text"), JobStatus::Completed));

		let summarizer: Arc<dyn media_core::ports::Summarizer> = Arc::new(FakeSummarizer { configured: false, outcome: std::sync::Mutex::new(None) });
		let store: Arc<dyn media_core::ports::Store> = fake_store.clone();

		run(&store, &summarizer, &CancellationToken::new(), id, SummaryLength::Medium, SummaryStyle::Narrative, None).await;

		assert!(fake_store.summaries_for(id).is_empty());
	}
}
