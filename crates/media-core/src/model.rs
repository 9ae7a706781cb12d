use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle shared by transcripts and audio transcriptions: a record starts
/// `pending`, a worker flips it to `processing`, and it settles into exactly
/// one terminal state. Terminal states are immutable except by delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Processing,
	Completed,
	Failed,
}

impl JobStatus {
	#[must_use]
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
	#[default]
	None,
	Processing,
	Completed,
	Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AudioContentType {
	General,
	PhoneCall,
	Meeting,
	VoiceMemo,
	Interview,
	Lecture,
}

impl AudioContentType {
	/// Only phone calls and meetings carry action items / decisions (spec.md §4.4).
	#[must_use]
	pub const fn wants_action_items(self) -> bool {
		matches!(self, Self::PhoneCall | Self::Meeting)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
	Short,
	Medium,
	Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
	Bullet,
	Narrative,
	Academic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
	Processing,
	Completed,
	Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	Pending,
	Success,
	Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
	pub id: Uuid,
	pub youtube_url: String,
	pub youtube_id: String,
	pub title: Option<String>,
	pub channel_name: Option<String>,
	pub duration_seconds: Option<i64>,
	pub language: Option<String>,
	pub text: Option<String>,
	pub word_count: Option<i64>,
	pub status: JobStatus,
	pub error_message: String,
	pub batch_id: Option<Uuid>,
	pub owner_key_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTranscription {
	pub id: Uuid,
	pub filename: String,
	pub original_name: String,
	pub duration_seconds: Option<i64>,
	pub language: Option<String>,
	pub text: Option<String>,
	pub word_count: Option<i64>,
	pub status: JobStatus,
	pub error_message: String,
	pub content_type: AudioContentType,
	pub summary_text: Option<String>,
	pub key_points: Vec<String>,
	pub action_items: Vec<String>,
	pub decisions: Vec<String>,
	pub summary_model: Option<String>,
	pub summary_status: SummaryStatus,
	pub owner_key_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfExtraction {
	pub id: Uuid,
	pub filename: String,
	pub original_name: String,
	pub text: Option<String>,
	pub word_count: Option<i64>,
	pub status: JobStatus,
	pub error_message: String,
	pub owner_key_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
	pub id: Uuid,
	pub transcript_id: Uuid,
	pub model_used: String,
	pub prompt_used: String,
	pub summary_text: String,
	pub key_points: Vec<String>,
	pub length: SummaryLength,
	pub style: SummaryStyle,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
	pub id: Uuid,
	pub status: BatchStatus,
	pub total_count: i64,
	pub completed_count: i64,
	pub failed_count: i64,
	pub owner_key_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
	pub id: Uuid,
	pub owner_key_id: Uuid,
	pub url: String,
	pub events: Vec<String>,
	/// Opaque HMAC signing key. Returned to the caller only at creation time
	/// (spec.md §4.8) — never re-read through `GetActiveWebhooksForEvent`'s
	/// public-facing view, only by the delivery engine.
	pub secret: String,
	pub active: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
	pub id: Uuid,
	pub webhook_id: Uuid,
	pub event: String,
	pub payload: serde_json::Value,
	pub status: DeliveryStatus,
	pub attempts: u32,
	pub last_error: Option<String>,
	pub response_code: Option<u16>,
	pub created_at: DateTime<Utc>,
	pub delivered_at: Option<DateTime<Utc>>,
}

/// Whitespace-tokenized word count, the sole definition invariant (a) in
/// spec.md §3 is allowed to use.
#[must_use]
pub fn word_count(text: &str) -> i64 {
	text.split_whitespace().count() as i64
}
