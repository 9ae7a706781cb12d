//! Fakes shared by this crate's unit tests. Not compiled outside `cfg(test)`.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use media_core::model::{AudioTranscription, Batch, BatchStatus, JobStatus, PdfExtraction, Summary, Transcript, Webhook, WebhookDelivery};
use media_core::ports::{
	AudioSummaryUpdate, AudioUpdate, BatchCounts, BlobStore, ExtractError, ExtractedTranscript, Extractor, ListParams, NewAudioTranscription, NewSummary, NewTranscript, NewWebhook, Store,
	Summarizer, SummarizeError, SummarizeOptions, SummarizeResult, TranscriptUpdate, Whisper, WebhookPublisher, WhisperError, WhisperResult,
};
use media_core::ServiceError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
	transcripts: HashMap<Uuid, Transcript>,
	audio: HashMap<Uuid, AudioTranscription>,
	batches: HashMap<Uuid, Batch>,
	summaries: Vec<Summary>,
}

#[derive(Default)]
pub struct FakeStore {
	inner: Mutex<Inner>,
}

impl FakeStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_transcript(&self, transcript: Transcript) {
		self.inner.lock().unwrap().transcripts.insert(transcript.id, transcript);
	}

	pub fn insert_audio(&self, audio: AudioTranscription) {
		self.inner.lock().unwrap().audio.insert(audio.id, audio);
	}

	pub fn insert_batch(&self, batch: Batch) {
		self.inner.lock().unwrap().batches.insert(batch.id, batch);
	}

	pub fn transcript(&self, id: Uuid) -> Transcript {
		self.inner.lock().unwrap().transcripts.get(&id).cloned().unwrap()
	}

	pub fn audio(&self, id: Uuid) -> AudioTranscription {
		self.inner.lock().unwrap().audio.get(&id).cloned().unwrap()
	}

	pub fn batch(&self, id: Uuid) -> Batch {
		self.inner.lock().unwrap().batches.get(&id).cloned().unwrap()
	}

	pub fn summaries_for(&self, transcript_id: Uuid) -> Vec<Summary> {
		self.inner.lock().unwrap().summaries.iter().filter(|s| s.transcript_id == transcript_id).cloned().collect()
	}
}

#[async_trait]
impl Store for FakeStore {
	async fn create_transcript(&self, _ct: &CancellationToken, _new: NewTranscript) -> Result<Transcript, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn get_transcript(&self, _ct: &CancellationToken, id: Uuid) -> Result<Option<Transcript>, ServiceError> {
		Ok(self.inner.lock().unwrap().transcripts.get(&id).cloned())
	}

	async fn get_transcript_by_youtube_id(&self, _ct: &CancellationToken, youtube_id: &str) -> Result<Option<Transcript>, ServiceError> {
		Ok(self.inner.lock().unwrap().transcripts.values().find(|t| t.youtube_id == youtube_id).cloned())
	}

	async fn update_transcript(&self, _ct: &CancellationToken, id: Uuid, update: TranscriptUpdate) -> Result<Transcript, ServiceError> {
		let mut guard = self.inner.lock().unwrap();
		let transcript = guard.transcripts.get_mut(&id).ok_or(ServiceError::NotFound)?;
		if let Some(status) = update.status {
			transcript.status = status;
		}
		if update.title.is_some() {
			transcript.title = update.title;
		}
		if update.channel_name.is_some() {
			transcript.channel_name = update.channel_name;
		}
		if update.duration_seconds.is_some() {
			transcript.duration_seconds = update.duration_seconds;
		}
		if update.language.is_some() {
			transcript.language = update.language;
		}
		if update.text.is_some() {
			transcript.text = update.text;
		}
		if update.word_count.is_some() {
			transcript.word_count = update.word_count;
		}
		if let Some(error_message) = update.error_message {
			transcript.error_message = error_message;
		}
		transcript.updated_at = chrono::Utc::now();
		Ok(transcript.clone())
	}

	async fn delete_transcript(&self, _ct: &CancellationToken, _id: Uuid, _requester: Option<Uuid>) -> Result<(), ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn list_transcripts(&self, _ct: &CancellationToken, _params: ListParams) -> Result<Vec<Transcript>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn create_audio_transcription(&self, _ct: &CancellationToken, _new: NewAudioTranscription) -> Result<AudioTranscription, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn get_audio_transcription(&self, _ct: &CancellationToken, id: Uuid) -> Result<Option<AudioTranscription>, ServiceError> {
		Ok(self.inner.lock().unwrap().audio.get(&id).cloned())
	}

	async fn update_audio_transcription(&self, _ct: &CancellationToken, id: Uuid, update: AudioUpdate) -> Result<AudioTranscription, ServiceError> {
		let mut guard = self.inner.lock().unwrap();
		let audio = guard.audio.get_mut(&id).ok_or(ServiceError::NotFound)?;
		if let Some(status) = update.status {
			audio.status = status;
		}
		if update.duration_seconds.is_some() {
			audio.duration_seconds = update.duration_seconds;
		}
		if update.language.is_some() {
			audio.language = update.language;
		}
		if update.text.is_some() {
			audio.text = update.text;
		}
		if update.word_count.is_some() {
			audio.word_count = update.word_count;
		}
		if let Some(error_message) = update.error_message {
			audio.error_message = error_message;
		}
		audio.updated_at = chrono::Utc::now();
		Ok(audio.clone())
	}

	async fn update_audio_summary(&self, _ct: &CancellationToken, id: Uuid, update: AudioSummaryUpdate) -> Result<AudioTranscription, ServiceError> {
		let mut guard = self.inner.lock().unwrap();
		let audio = guard.audio.get_mut(&id).ok_or(ServiceError::NotFound)?;
		audio.summary_status = update.summary_status;
		if update.summary_text.is_some() {
			audio.summary_text = update.summary_text;
		}
		audio.key_points = update.key_points;
		audio.action_items = update.action_items;
		audio.decisions = update.decisions;
		if update.summary_model.is_some() {
			audio.summary_model = update.summary_model;
		}
		audio.updated_at = chrono::Utc::now();
		Ok(audio.clone())
	}

	async fn list_audio_transcriptions(&self, _ct: &CancellationToken, _params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn search_audio_transcriptions(&self, _ct: &CancellationToken, _query: &str, _params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn create_pdf_extraction(&self, _ct: &CancellationToken, record: PdfExtraction) -> Result<PdfExtraction, ServiceError> {
		Ok(record)
	}

	async fn get_pdf_extraction(&self, _ct: &CancellationToken, _id: Uuid) -> Result<Option<PdfExtraction>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn list_pdf_extractions(&self, _ct: &CancellationToken, _params: ListParams) -> Result<Vec<PdfExtraction>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn delete_pdf_extraction(&self, _ct: &CancellationToken, _id: Uuid, _requester: Option<Uuid>) -> Result<(), ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn create_summary(&self, _ct: &CancellationToken, new: NewSummary) -> Result<Summary, ServiceError> {
		let summary = Summary {
			id: Uuid::new_v4(),
			transcript_id: new.transcript_id,
			model_used: new.model_used,
			prompt_used: new.prompt_used,
			summary_text: new.summary_text,
			key_points: new.key_points,
			length: new.length,
			style: new.style,
			created_at: chrono::Utc::now(),
		};
		self.inner.lock().unwrap().summaries.push(summary.clone());
		Ok(summary)
	}

	async fn get_summaries_by_transcript(&self, _ct: &CancellationToken, transcript_id: Uuid) -> Result<Vec<Summary>, ServiceError> {
		Ok(self.summaries_for(transcript_id))
	}

	async fn create_batch(&self, _ct: &CancellationToken, _owner_key_id: Option<Uuid>, _urls: &[String]) -> Result<(Batch, Vec<Transcript>), ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn get_batch(&self, _ct: &CancellationToken, id: Uuid) -> Result<Option<Batch>, ServiceError> {
		Ok(self.inner.lock().unwrap().batches.get(&id).cloned())
	}

	async fn get_transcripts_by_batch(&self, _ct: &CancellationToken, batch_id: Uuid) -> Result<Vec<Transcript>, ServiceError> {
		Ok(self.inner.lock().unwrap().transcripts.values().filter(|t| t.batch_id == Some(batch_id)).cloned().collect())
	}

	async fn create_transcript_with_batch(&self, _ct: &CancellationToken, _batch_id: Uuid, _new: NewTranscript) -> Result<Transcript, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn update_batch_counts(&self, _ct: &CancellationToken, batch_id: Uuid) -> Result<BatchCounts, ServiceError> {
		let mut guard = self.inner.lock().unwrap();
		let children: Vec<Transcript> = guard.transcripts.values().filter(|t| t.batch_id == Some(batch_id)).cloned().collect();
		let total = children.len() as i64;
		let completed = children.iter().filter(|t| t.status == JobStatus::Completed).count() as i64;
		let failed = children.iter().filter(|t| t.status == JobStatus::Failed).count() as i64;
		let pending_or_processing = children.iter().filter(|t| matches!(t.status, JobStatus::Pending | JobStatus::Processing)).count();

		let status = if pending_or_processing > 0 {
			BatchStatus::Processing
		} else if failed > 0 && completed == 0 {
			BatchStatus::Failed
		} else {
			BatchStatus::Completed
		};

		let batch = guard.batches.get_mut(&batch_id).ok_or(ServiceError::NotFound)?;
		batch.total_count = total;
		batch.completed_count = completed;
		batch.failed_count = failed;
		batch.status = status;

		Ok(BatchCounts {
			total,
			completed,
			failed,
			reached_terminal: pending_or_processing == 0,
		})
	}

	async fn create_webhook(&self, _ct: &CancellationToken, _new: NewWebhook) -> Result<Webhook, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn get_active_webhooks_for_event(&self, _ct: &CancellationToken, _event: &str) -> Result<Vec<Webhook>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn update_webhook_active(&self, _ct: &CancellationToken, _id: Uuid, _owner_key_id: Uuid, _active: bool) -> Result<Webhook, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn delete_webhook(&self, _ct: &CancellationToken, _id: Uuid, _owner_key_id: Uuid) -> Result<(), ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn list_webhooks_by_owner(&self, _ct: &CancellationToken, _owner_key_id: Uuid) -> Result<Vec<Webhook>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn create_webhook_delivery(&self, _ct: &CancellationToken, _webhook_id: Uuid, _event: &str, _payload: Value) -> Result<WebhookDelivery, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn update_webhook_delivery(&self, _ct: &CancellationToken, _delivery: &WebhookDelivery) -> Result<(), ServiceError> {
		unimplemented!("not exercised by executor tests")
	}

	async fn list_webhook_deliveries(&self, _ct: &CancellationToken, _params: ListParams) -> Result<Vec<WebhookDelivery>, ServiceError> {
		unimplemented!("not exercised by executor tests")
	}
}

/// Scripted extractor: returns a fixed outcome regardless of input.
pub struct FakeExtractor {
	pub outcome: Mutex<Option<Result<ExtractedTranscript, ExtractError>>>,
}

impl FakeExtractor {
	pub fn ok(extracted: ExtractedTranscript) -> Self {
		Self {
			outcome: Mutex::new(Some(Ok(extracted))),
		}
	}

	pub fn err(error: ExtractError) -> Self {
		Self {
			outcome: Mutex::new(Some(Err(error))),
		}
	}
}

#[async_trait]
impl Extractor for FakeExtractor {
	async fn extract(&self, _ct: &CancellationToken, _youtube_url: &str) -> Result<ExtractedTranscript, ExtractError> {
		self.outcome.lock().unwrap().take().expect("FakeExtractor called more than once")
	}
}

/// Scripted whisper port.
pub struct FakeWhisper {
	pub configured: bool,
	pub outcome: Mutex<Option<Result<WhisperResult, WhisperError>>>,
}

impl FakeWhisper {
	pub fn ok(result: WhisperResult) -> Self {
		Self {
			configured: true,
			outcome: Mutex::new(Some(Ok(result))),
		}
	}

	pub fn unconfigured() -> Self {
		Self {
			configured: false,
			outcome: Mutex::new(None),
		}
	}
}

#[async_trait]
impl Whisper for FakeWhisper {
	fn is_configured(&self) -> bool {
		self.configured
	}

	async fn transcribe(&self, _ct: &CancellationToken, _audio: Vec<u8>, _filename: &str) -> Result<WhisperResult, WhisperError> {
		self.outcome.lock().unwrap().take().expect("FakeWhisper called more than once")
	}
}

/// Scripted summarizer port.
pub struct FakeSummarizer {
	pub configured: bool,
	pub outcome: Mutex<Option<Result<SummarizeResult, SummarizeError>>>,
}

impl FakeSummarizer {
	pub fn ok(result: SummarizeResult) -> Self {
		Self {
			configured: true,
			outcome: Mutex::new(Some(Ok(result))),
		}
	}
}

#[async_trait]
impl Summarizer for FakeSummarizer {
	fn is_configured(&self) -> bool {
		self.configured
	}

	async fn summarize(&self, _ct: &CancellationToken, _text: &str, _options: &SummarizeOptions) -> Result<SummarizeResult, SummarizeError> {
		self.outcome.lock().unwrap().take().expect("FakeSummarizer called more than once")
	}
}

/// Scripted blob store: hands back fixed bytes regardless of filename.
pub struct FakeBlobStore {
	pub outcome: Mutex<Option<Result<Vec<u8>, ServiceError>>>,
}

impl FakeBlobStore {
	pub fn ok(bytes: impl Into<Vec<u8>>) -> Self {
		Self {
			outcome: Mutex::new(Some(Ok(bytes.into()))),
		}
	}
}

#[async_trait]
impl BlobStore for FakeBlobStore {
	async fn read(&self, _ct: &CancellationToken, _filename: &str) -> Result<Vec<u8>, ServiceError> {
		self.outcome.lock().unwrap().take().expect("FakeBlobStore called more than once")
	}

	async fn write(&self, _ct: &CancellationToken, _filename: &str, _bytes: Vec<u8>) -> Result<(), ServiceError> {
		Ok(())
	}
}

/// Captures every published event for assertions instead of delivering it.
#[derive(Default)]
pub struct FakeWebhookPublisher {
	pub published: Mutex<Vec<(String, Value)>>,
}

impl FakeWebhookPublisher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<(String, Value)> {
		self.published.lock().unwrap().clone()
	}
}

#[async_trait]
impl WebhookPublisher for FakeWebhookPublisher {
	async fn publish_event(&self, event: &str, payload: Value) {
		self.published.lock().unwrap().push((event.to_string(), payload));
	}
}
