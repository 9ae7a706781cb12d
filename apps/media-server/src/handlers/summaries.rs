use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::model::{JobStatus, Summary, SummaryLength, SummaryStyle};
use media_core::{Job, JobKind, ServiceError};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::OptionalApiKey;
use crate::handlers::{request_ct, submit_job};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSummaryRequest {
	pub transcript_id: Uuid,
	pub length: Option<String>,
	pub style: Option<String>,
	pub model: Option<String>,
}

fn parse_length(raw: Option<&str>) -> SummaryLength {
	match raw {
		Some("short") => SummaryLength::Short,
		Some("detailed") => SummaryLength::Detailed,
		_ => SummaryLength::Medium,
	}
}

fn parse_style(raw: Option<&str>) -> SummaryStyle {
	match raw {
		Some("narrative") => SummaryStyle::Narrative,
		Some("academic") => SummaryStyle::Academic,
		_ => SummaryStyle::Bullet,
	}
}

/// `POST /api/v1/summaries` (spec.md §6). A transcript still `processing`
/// (or otherwise not yet `completed`) is rejected with 409
/// `transcript_not_ready` (scenario S6) before any job is enqueued.
pub async fn create_summary(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Json(body): Json<CreateSummaryRequest>) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
	if !state.external.summarizer.is_configured() {
		return Err(ServiceError::Unconfigured("summarizer".to_string()));
	}

	let ct = request_ct();
	let transcript = state.core.store.get_transcript(&ct, body.transcript_id).await?.ok_or(ServiceError::NotFound)?;
	if transcript.status != JobStatus::Completed || transcript.text.is_none() {
		return Err(ServiceError::Conflict("transcript_not_ready".to_string()));
	}

	let length = parse_length(body.length.as_deref());
	let style = parse_style(body.style.as_deref());
	let summary_id = Uuid::new_v4();

	let job = Job::new(
		summary_id,
		JobKind::SummaryGeneration {
			transcript_id: body.transcript_id,
			summary_id,
			length,
			style,
			model_override: body.model.clone(),
		},
	);
	submit_job(&state.core.config, &state.jobs.queue, owner, job).await?;

	Ok((
		StatusCode::ACCEPTED,
		Json(serde_json::json!({ "summary_id": summary_id, "transcript_id": body.transcript_id, "status": "processing" })),
	))
}

pub async fn list_summaries_for_transcript(State(state): State<AppState>, Path(transcript_id): Path<Uuid>) -> Result<Json<Vec<Summary>>, ServiceError> {
	let ct = request_ct();
	let summaries = state.core.store.get_summaries_by_transcript(&ct, transcript_id).await?;
	Ok(Json(summaries))
}
