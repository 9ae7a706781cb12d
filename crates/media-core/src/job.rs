use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AudioContentType, SummaryLength, SummaryStyle};

/// Closed sum over the three job variants (spec.md §9: "prefer a
/// tagged-union / switch over interface polymorphism so new job types are
/// additive and exhaustive-checkable"). Each variant carries exactly the
/// payload its executor needs to decode; a tag mismatch at decode time is an
/// internal error, never a silent default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobKind {
	TranscriptExtraction { transcript_id: Uuid },
	AudioTranscription {
		audio_id: Uuid,
		with_summary: bool,
		content_type: AudioContentType,
	},
	SummaryGeneration {
		transcript_id: Uuid,
		summary_id: Uuid,
		length: SummaryLength,
		style: SummaryStyle,
		model_override: Option<String>,
	},
	/// Post-hoc summarization of an already-transcribed audio upload
	/// (`POST /audio/transcriptions/:id/summarize`), distinct from the
	/// `with_summary` flag on [`JobKind::AudioTranscription`] which chains a
	/// summary onto a *fresh* transcription in the same job. This variant
	/// never re-runs transcription, so it still dispatches when the audio
	/// record is already in a terminal state.
	AudioSummaryGeneration {
		audio_id: Uuid,
		content_type: AudioContentType,
		length: SummaryLength,
		style: SummaryStyle,
		model_override: Option<String>,
	},
}

impl JobKind {
	#[must_use]
	pub const fn label(&self) -> &'static str {
		match self {
			Self::TranscriptExtraction { .. } => "transcript_extraction",
			Self::AudioTranscription { .. } => "audio_transcription",
			Self::SummaryGeneration { .. } => "summary_generation",
			Self::AudioSummaryGeneration { .. } => "audio_summary_generation",
		}
	}
}

/// A unit of asynchronous work: `(entity id, type tag, payload)`
/// (spec.md GLOSSARY). `id` names the owning record so workers and log
/// lines can refer to a job without decoding its payload first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
	pub id: Uuid,
	pub kind: JobKind,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
	#[must_use]
	pub fn new(id: Uuid, kind: JobKind) -> Self {
		Self { id, kind, created_at: chrono::Utc::now() }
	}
}

/// Per-job-type deadline policy (spec.md §9 Open Question 1: "introduce a
/// per-job deadline policy table rather than rely on external tools'
/// behavior"). These mirror the per-call timeouts of §5 but are keyed by job
/// kind so a worker can bound the *whole* job, not just one IO step inside
/// it.
#[must_use]
pub const fn job_deadline(kind: &JobKind) -> Duration {
	match kind {
		JobKind::TranscriptExtraction { .. } => Duration::from_secs(180),
		JobKind::AudioTranscription { .. } => Duration::from_secs(600),
		JobKind::SummaryGeneration { .. } | JobKind::AudioSummaryGeneration { .. } => Duration::from_secs(120),
	}
}
