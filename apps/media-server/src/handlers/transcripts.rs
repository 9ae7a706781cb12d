use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::ports::{ListParams, NewTranscript, SortDir, TRANSCRIPT_SORT_COLUMNS};
use media_core::{parse_video_id, Job, JobKind, ServiceError};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{ApiKey, OptionalApiKey};
use crate::handlers::{request_ct, submit_job};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTranscriptRequest {
	pub url: Option<String>,
	pub video_id: Option<String>,
}

/// `POST /api/v1/transcripts` (spec.md §6). Dedup hit short-circuits
/// extraction and returns 200 instead of 202 (spec.md §3 invariant (d)).
pub async fn create_transcript(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Json(body): Json<CreateTranscriptRequest>) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
	let raw = body.url.as_deref().or(body.video_id.as_deref()).ok_or_else(|| ServiceError::Validation("url or video_id required".to_string()))?;
	let youtube_id = parse_video_id(raw).ok_or_else(|| ServiceError::Validation("invalid_url".to_string()))?;
	let youtube_url = body.url.clone().unwrap_or_else(|| format!("https://www.youtube.com/watch?v={youtube_id}"));

	let ct = request_ct();

	if let Some(existing) = state.core.store.get_transcript_by_youtube_id(&ct, &youtube_id).await? {
		return Ok((StatusCode::OK, Json(serde_json::to_value(existing).map_err(|e| ServiceError::Internal(e.to_string()))?)));
	}

	let transcript = state
		.core
		.store
		.create_transcript(&ct, NewTranscript { youtube_url, youtube_id, owner_key_id: owner, batch_id: None })
		.await?;

	let job = Job::new(transcript.id, JobKind::TranscriptExtraction { transcript_id: transcript.id });
	submit_job(&state.core.config, &state.jobs.queue, owner, job).await?;

	Ok((StatusCode::ACCEPTED, Json(serde_json::to_value(transcript).map_err(|e| ServiceError::Internal(e.to_string()))?)))
}

pub async fn get_transcript(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<media_core::model::Transcript>, ServiceError> {
	let ct = request_ct();
	let transcript = state.core.store.get_transcript(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	Ok(Json(transcript))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
	pub page: Option<u32>,
	pub per_page: Option<u32>,
	pub sort_by: Option<String>,
	pub sort_dir: Option<String>,
}

pub async fn list_transcripts(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Query(query): Query<ListQuery>) -> Result<Json<Vec<media_core::model::Transcript>>, ServiceError> {
	let ct = request_ct();
	let mut filters = HashMap::new();
	if let Some(owner) = owner {
		filters.insert("owner_key_id".to_string(), owner.to_string());
	}

	let params = ListParams {
		page: query.page.unwrap_or(1),
		per_page: query.per_page.unwrap_or(20),
		sort_by: query.sort_by.unwrap_or_else(|| "created_at".to_string()),
		sort_dir: SortDir::parse_or_default(query.sort_dir.as_deref()),
		filters,
	}
	.normalize(TRANSCRIPT_SORT_COLUMNS);

	let transcripts = state.core.store.list_transcripts(&ct, params).await?;
	Ok(Json(transcripts))
}

pub async fn delete_transcript(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Path(id): Path<Uuid>) -> Result<StatusCode, ServiceError> {
	let ct = request_ct();
	state.core.store.delete_transcript(&ct, id, owner).await?;
	Ok(StatusCode::NO_CONTENT)
}
