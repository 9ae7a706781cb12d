use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::model::{
	AudioContentType, AudioTranscription, Batch, JobStatus, PdfExtraction, Summary, SummaryLength, SummaryStatus, SummaryStyle, Transcript, Webhook, WebhookDelivery,
};

/// Allow-listed sort columns for `ListTranscripts`. Anything else falls back
/// to `created_at` (spec.md §4.1) — this list is also what stands between a
/// client-controlled `sort_by` string and a SQL-injection-by-identifier bug.
pub const TRANSCRIPT_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "title", "status", "duration_seconds"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
	Asc,
	Desc,
}

impl SortDir {
	#[must_use]
	pub fn parse_or_default(s: Option<&str>) -> Self {
		match s.map(str::to_ascii_lowercase).as_deref() {
			Some("asc") => Self::Asc,
			_ => Self::Desc,
		}
	}

	#[must_use]
	pub const fn as_sql(self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

#[derive(Debug, Clone)]
pub struct ListParams {
	pub page: u32,
	pub per_page: u32,
	pub sort_by: String,
	pub sort_dir: SortDir,
	pub filters: HashMap<String, String>,
}

impl ListParams {
	/// Clamp to spec.md §4.1's bounds and fall back to `created_at`/`desc`
	/// for anything invalid, rather than erroring the request.
	#[must_use]
	pub fn normalize(mut self, allowed_sort_columns: &[&str]) -> Self {
		self.page = self.page.max(1);
		self.per_page = self.per_page.clamp(1, 100);
		if !allowed_sort_columns.contains(&self.sort_by.as_str()) {
			self.sort_by = "created_at".to_string();
		}
		self
	}

	#[must_use]
	pub const fn offset(&self) -> i64 {
		((self.page - 1) * self.per_page) as i64
	}

	#[must_use]
	pub const fn limit(&self) -> i64 {
		self.per_page as i64
	}
}

impl Default for ListParams {
	fn default() -> Self {
		Self {
			page: 1,
			per_page: 20,
			sort_by: "created_at".to_string(),
			sort_dir: SortDir::Desc,
			filters: HashMap::new(),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptUpdate {
	pub status: Option<JobStatus>,
	pub title: Option<String>,
	pub channel_name: Option<String>,
	pub duration_seconds: Option<i64>,
	pub language: Option<String>,
	pub text: Option<String>,
	pub word_count: Option<i64>,
	pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AudioUpdate {
	pub status: Option<JobStatus>,
	pub duration_seconds: Option<i64>,
	pub language: Option<String>,
	pub text: Option<String>,
	pub word_count: Option<i64>,
	pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AudioSummaryUpdate {
	pub summary_status: SummaryStatus,
	pub summary_text: Option<String>,
	pub key_points: Vec<String>,
	pub action_items: Vec<String>,
	pub decisions: Vec<String>,
	pub summary_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTranscript {
	pub youtube_url: String,
	pub youtube_id: String,
	pub owner_key_id: Option<Uuid>,
	pub batch_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewAudioTranscription {
	pub filename: String,
	pub original_name: String,
	pub content_type: AudioContentType,
	pub owner_key_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewSummary {
	pub transcript_id: Uuid,
	pub model_used: String,
	pub prompt_used: String,
	pub summary_text: String,
	pub key_points: Vec<String>,
	pub length: SummaryLength,
	pub style: SummaryStyle,
}

#[derive(Debug, Clone)]
pub struct NewWebhook {
	pub owner_key_id: Uuid,
	pub url: String,
	pub events: Vec<String>,
	pub secret: String,
}

/// Result of `UpdateBatchCounts`: derived strictly from child statuses
/// (spec.md §4.1 truth table), never trusted as a cache.
#[derive(Debug, Clone, Copy)]
pub struct BatchCounts {
	pub total: i64,
	pub completed: i64,
	pub failed: i64,
	pub reached_terminal: bool,
}

/// The persistence port (C1, spec.md §4.1). Every operation is cancellable;
/// implementations must abort in-flight work rather than let the token go
/// unheeded once it fires.
#[async_trait]
pub trait Store: Send + Sync + 'static {
	async fn create_transcript(&self, ct: &CancellationToken, new: NewTranscript) -> Result<Transcript, ServiceError>;
	async fn get_transcript(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<Transcript>, ServiceError>;
	async fn get_transcript_by_youtube_id(&self, ct: &CancellationToken, youtube_id: &str) -> Result<Option<Transcript>, ServiceError>;
	async fn update_transcript(&self, ct: &CancellationToken, id: Uuid, update: TranscriptUpdate) -> Result<Transcript, ServiceError>;
	async fn delete_transcript(&self, ct: &CancellationToken, id: Uuid, requester: Option<Uuid>) -> Result<(), ServiceError>;
	async fn list_transcripts(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<Transcript>, ServiceError>;

	async fn create_audio_transcription(&self, ct: &CancellationToken, new: NewAudioTranscription) -> Result<AudioTranscription, ServiceError>;
	async fn get_audio_transcription(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<AudioTranscription>, ServiceError>;
	async fn update_audio_transcription(&self, ct: &CancellationToken, id: Uuid, update: AudioUpdate) -> Result<AudioTranscription, ServiceError>;
	async fn update_audio_summary(&self, ct: &CancellationToken, id: Uuid, update: AudioSummaryUpdate) -> Result<AudioTranscription, ServiceError>;
	async fn list_audio_transcriptions(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError>;
	async fn search_audio_transcriptions(&self, ct: &CancellationToken, query: &str, params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError>;

	async fn create_pdf_extraction(&self, ct: &CancellationToken, record: PdfExtraction) -> Result<PdfExtraction, ServiceError>;
	async fn get_pdf_extraction(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<PdfExtraction>, ServiceError>;
	async fn list_pdf_extractions(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<PdfExtraction>, ServiceError>;
	async fn delete_pdf_extraction(&self, ct: &CancellationToken, id: Uuid, requester: Option<Uuid>) -> Result<(), ServiceError>;

	async fn create_summary(&self, ct: &CancellationToken, new: NewSummary) -> Result<Summary, ServiceError>;
	async fn get_summaries_by_transcript(&self, ct: &CancellationToken, transcript_id: Uuid) -> Result<Vec<Summary>, ServiceError>;

	async fn create_batch(&self, ct: &CancellationToken, owner_key_id: Option<Uuid>, urls: &[String]) -> Result<(Batch, Vec<Transcript>), ServiceError>;
	async fn get_batch(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<Batch>, ServiceError>;
	async fn get_transcripts_by_batch(&self, ct: &CancellationToken, batch_id: Uuid) -> Result<Vec<Transcript>, ServiceError>;
	async fn create_transcript_with_batch(&self, ct: &CancellationToken, batch_id: Uuid, new: NewTranscript) -> Result<Transcript, ServiceError>;
	async fn update_batch_counts(&self, ct: &CancellationToken, batch_id: Uuid) -> Result<BatchCounts, ServiceError>;

	async fn create_webhook(&self, ct: &CancellationToken, new: NewWebhook) -> Result<Webhook, ServiceError>;
	async fn get_active_webhooks_for_event(&self, ct: &CancellationToken, event: &str) -> Result<Vec<Webhook>, ServiceError>;
	async fn update_webhook_active(&self, ct: &CancellationToken, id: Uuid, owner_key_id: Uuid, active: bool) -> Result<Webhook, ServiceError>;
	async fn delete_webhook(&self, ct: &CancellationToken, id: Uuid, owner_key_id: Uuid) -> Result<(), ServiceError>;
	async fn list_webhooks_by_owner(&self, ct: &CancellationToken, owner_key_id: Uuid) -> Result<Vec<Webhook>, ServiceError>;

	async fn create_webhook_delivery(&self, ct: &CancellationToken, webhook_id: Uuid, event: &str, payload: serde_json::Value) -> Result<WebhookDelivery, ServiceError>;
	async fn update_webhook_delivery(&self, ct: &CancellationToken, delivery: &WebhookDelivery) -> Result<(), ServiceError>;
	async fn list_webhook_deliveries(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<WebhookDelivery>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ExtractedTranscript {
	pub title: Option<String>,
	pub channel_name: Option<String>,
	pub duration_seconds: Option<i64>,
	pub language: String,
	pub text: String,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ExtractError {
	#[error("invalid_url")]
	InvalidUrl,
	#[error("subprocess_failed: {0}")]
	SubprocessFailed(String),
	#[error("timeout")]
	Timeout,
	#[error("no_captions")]
	NoCaptions,
	#[error("blocked")]
	Blocked,
	#[error("cancelled")]
	Cancelled,
}

/// Extractor Port (C2, spec.md §4.2): drives the external transcript
/// subprocess (with Whisper fallback when no captions are available).
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
	async fn extract(&self, ct: &CancellationToken, youtube_url: &str) -> Result<ExtractedTranscript, ExtractError>;
}

#[derive(Debug, Clone)]
pub struct WhisperResult {
	pub text: String,
	pub language: String,
	pub duration_seconds: i64,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum WhisperError {
	#[error("unconfigured")]
	Unconfigured,
	#[error("upload_failed: {0}")]
	UploadFailed(String),
	#[error("remote_error({0}): {1}")]
	RemoteError(u16, String),
	#[error("parse_failed")]
	ParseFailed,
	#[error("cancelled")]
	Cancelled,
}

/// Whisper Port (C3, spec.md §4.3). `is_configured` lets callers degrade
/// (disable YouTube's no-captions fallback, 503 the audio endpoints) rather
/// than fail outright.
#[async_trait]
pub trait Whisper: Send + Sync + 'static {
	fn is_configured(&self) -> bool;
	async fn transcribe(&self, ct: &CancellationToken, audio: Vec<u8>, filename: &str) -> Result<WhisperResult, WhisperError>;
}

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
	pub length: SummaryLength,
	pub style: SummaryStyle,
	pub content_type: Option<AudioContentType>,
	pub model_override: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SummarizeResult {
	pub summary_text: String,
	pub key_points: Vec<String>,
	pub action_items: Vec<String>,
	pub decisions: Vec<String>,
	pub model_used: String,
	pub prompt_used: String,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SummarizeError {
	#[error("unconfigured")]
	Unconfigured,
	#[error("remote_error({0}): {1}")]
	RemoteError(u16, String),
	#[error("parse_failed")]
	ParseFailed,
	#[error("cancelled")]
	Cancelled,
}

/// Summarizer Port (C4, spec.md §4.4).
#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
	fn is_configured(&self) -> bool;
	async fn summarize(&self, ct: &CancellationToken, text: &str, options: &SummarizeOptions) -> Result<SummarizeResult, SummarizeError>;
}

/// Narrow publish-only view of the webhook engine (C9) that executors hold,
/// so `media-executors` never needs to know how retries/backoff work.
#[async_trait]
pub trait WebhookPublisher: Send + Sync + 'static {
	async fn publish_event(&self, event: &str, payload: serde_json::Value);
}

/// Opaque byte-stream storage for uploaded audio/PDF (spec.md §6: "the core
/// treats this as a byte stream and never relies on the disk copy after the
/// executor completes"). `filename` is the server-generated opaque name
/// recorded on the owning record, never a client-controlled path.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
	async fn read(&self, ct: &CancellationToken, filename: &str) -> Result<Vec<u8>, ServiceError>;

	/// Persists `bytes` under `filename` (a server-generated opaque name, never
	/// client-controlled). Handlers call this once, synchronously, before
	/// enqueuing a job so the worker that eventually dequeues it has
	/// something to `read` back (spec.md §6).
	async fn write(&self, ct: &CancellationToken, filename: &str, bytes: Vec<u8>) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ExtractedPdf {
	pub text: String,
	pub word_count: i64,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum PdfExtractError {
	#[error("invalid_pdf: {0}")]
	InvalidPdf(String),
	#[error("empty_document")]
	EmptyDocument,
}

/// PDF text-extraction port. Spec.md §3 treats `PDFExtraction` as a
/// synchronous workflow with no pending state, so — unlike C2-C4 — there is
/// no corresponding job kind or executor: the handler calls this port
/// directly and the record is created already in its terminal state.
pub trait PdfExtractor: Send + Sync + 'static {
	fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, PdfExtractError>;
}
