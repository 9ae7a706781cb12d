use std::sync::Arc;

use media_core::model::{word_count, AudioContentType, JobStatus, SummaryLength, SummaryStatus, SummaryStyle};
use media_core::ports::{AudioSummaryUpdate, AudioUpdate, BlobStore, SummarizeOptions, Store, Summarizer, WebhookPublisher, Whisper};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Runs the audio transcription job (C7, spec.md §4.3 + §4.6). When the
/// upload was submitted with `with_summary=true`, a successful transcription
/// is followed, synchronously and in the same job, by a summarization pass
/// (spec.md §4.4) — there is no separate queued job for it.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
	store: &Arc<dyn Store>,
	blobs: &Arc<dyn BlobStore>,
	whisper: &Arc<dyn Whisper>,
	summarizer: &Arc<dyn Summarizer>,
	webhooks: &Arc<dyn WebhookPublisher>,
	ct: &CancellationToken,
	audio_id: Uuid,
	with_summary: bool,
	content_type: AudioContentType,
) {
	let audio = match store.get_audio_transcription(ct, audio_id).await {
		Ok(Some(audio)) => audio,
		Ok(None) => {
			tracing::error!(%audio_id, "audio transcription job referenced a missing record");
			return;
		}
		Err(error) => {
			tracing::error!(%error, %audio_id, "failed to load audio transcription before transcribing");
			return;
		}
	};

	if audio.status.is_terminal() {
		tracing::debug!(%audio_id, status = ?audio.status, "audio transcription already terminal, skipping redelivered job");
		return;
	}

	if let Err(error) = store.update_audio_transcription(ct, audio_id, AudioUpdate { status: Some(JobStatus::Processing), ..Default::default() }).await {
		tracing::error!(%error, %audio_id, "failed to mark audio transcription processing");
		return;
	}

	let outcome = transcribe(whisper, blobs, ct, &audio.filename, &audio.original_name).await;
	let text_for_summary = outcome.as_ref().ok().map(|(text, _, _)| text.clone());

	let update = match outcome {
		Ok((text, language, duration_seconds)) => AudioUpdate {
			status: Some(JobStatus::Completed),
			duration_seconds: Some(duration_seconds),
			language: Some(language),
			word_count: Some(word_count(&text)),
			text: Some(text),
			error_message: Some(String::new()),
		},
		Err(message) => {
			tracing::warn!(%audio_id, reason = %message, "audio transcription failed");
			AudioUpdate {
				status: Some(JobStatus::Failed),
				error_message: Some(message),
				..Default::default()
			}
		}
	};

	let succeeded = matches!(update.status, Some(JobStatus::Completed));

	let updated = match store.update_audio_transcription(ct, audio_id, update).await {
		Ok(updated) => updated,
		Err(error) => {
			tracing::error!(%error, %audio_id, "failed to persist audio transcription outcome");
			return;
		}
	};

	let event = if succeeded { "audio.completed" } else { "audio.failed" };
	webhooks
		.publish_event(event, json!({ "id": updated.id, "status": updated.status, "error_message": updated.error_message }))
		.await;

	if succeeded && with_summary {
		if let Some(text) = text_for_summary {
			run_inline_summary(store, summarizer, ct, audio_id, &text, content_type, SummaryLength::Medium, SummaryStyle::Bullet, None).await;
		}
	}
}

/// Runs the standalone `audio_summary_generation` job (spec.md §6
/// `POST /audio/transcriptions/:id/summarize`). Unlike [`run`], this never
/// touches transcription state — it only requires the audio to already be
/// `completed` with text, so it still dispatches against a terminal record.
pub(crate) async fn run_summary(store: &Arc<dyn Store>, summarizer: &Arc<dyn Summarizer>, ct: &CancellationToken, audio_id: Uuid, content_type: AudioContentType, length: SummaryLength, style: SummaryStyle, model_override: Option<String>) {
	let audio = match store.get_audio_transcription(ct, audio_id).await {
		Ok(Some(audio)) => audio,
		Ok(None) => {
			tracing::error!(%audio_id, "audio summary job referenced a missing record");
			return;
		}
		Err(error) => {
			tracing::error!(%error, %audio_id, "failed to load audio transcription before summarizing");
			return;
		}
	};

	let Some(text) = audio.text.filter(|_| audio.status == JobStatus::Completed) else {
		tracing::warn!(%audio_id, status = ?audio.status, "audio summary job's audio is not completed with text, dropping");
		return;
	};

	run_inline_summary(store, summarizer, ct, audio_id, &text, content_type, length, style, model_override).await;
}

async fn transcribe(whisper: &Arc<dyn Whisper>, blobs: &Arc<dyn BlobStore>, ct: &CancellationToken, filename: &str, original_name: &str) -> Result<(String, String, i64), String> {
	if !whisper.is_configured() {
		return Err("unconfigured".to_string());
	}
	let bytes = blobs.read(ct, filename).await.map_err(|error| error.to_string())?;
	let result = whisper.transcribe(ct, bytes, original_name).await.map_err(|error| error.to_string())?;
	Ok((result.text, result.language, result.duration_seconds))
}

/// Shared by both summary paths: [`run`]'s inline `with_summary` step and
/// [`run_summary`]'s standalone job. Audio summarization has no status/error
/// field of its own on failure beyond `summary_status` (spec.md §4.4's
/// `AudioSummaryUpdate` carries no `last_error`), and spec.md §4.6's event
/// table has no row for it — failures here are logged, not published.
#[allow(clippy::too_many_arguments)]
async fn run_inline_summary(
	store: &Arc<dyn Store>,
	summarizer: &Arc<dyn Summarizer>,
	ct: &CancellationToken,
	audio_id: Uuid,
	text: &str,
	content_type: AudioContentType,
	length: SummaryLength,
	style: SummaryStyle,
	model_override: Option<String>,
) {
	if let Err(error) = store
		.update_audio_summary(ct, audio_id, AudioSummaryUpdate { summary_status: SummaryStatus::Processing, ..Default::default() })
		.await
	{
		tracing::error!(%error, %audio_id, "failed to mark audio summary processing");
		return;
	}

	if !summarizer.is_configured() {
		tracing::warn!(%audio_id, "summarizer unconfigured, leaving audio summary failed");
		let _ = store.update_audio_summary(ct, audio_id, AudioSummaryUpdate { summary_status: SummaryStatus::Failed, ..Default::default() }).await;
		return;
	}

	let options = SummarizeOptions { length, style, content_type: Some(content_type), model_override };

	let update = match summarizer.summarize(ct, text, &options).await {
		Ok(result) => AudioSummaryUpdate {
			summary_status: SummaryStatus::Completed,
			summary_text: Some(result.summary_text),
			key_points: result.key_points,
			action_items: result.action_items,
			decisions: result.decisions,
			summary_model: Some(result.model_used),
		},
		Err(error) => {
			tracing::warn!(%error, %audio_id, "inline audio summarization failed");
			AudioSummaryUpdate { summary_status: SummaryStatus::Failed, ..Default::default() }
		}
	};

	if let Err(error) = store.update_audio_summary(ct, audio_id, update).await {
		tracing::error!(%error, %audio_id, "failed to persist audio summary outcome");
	}
}
