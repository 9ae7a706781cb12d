use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::{parse_video_id, Job, JobKind, ServiceError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::OptionalApiKey;
use crate::handlers::{request_ct, submit_job};
use crate::state::AppState;

const MIN_BATCH_URLS: usize = 1;
const MAX_BATCH_URLS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
	pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBatchResponse {
	pub batch: media_core::model::Batch,
	pub transcripts: Vec<media_core::model::Transcript>,
}

/// `POST /api/v1/transcripts/batch` (spec.md §6, scenario S3). Every URL is
/// validated before any row is written — one invalid URL fails the whole
/// batch with 400 and creates nothing, per S3's "rejects the whole batch...
/// before creating any rows."
pub async fn create_batch(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Json(body): Json<CreateBatchRequest>) -> Result<(StatusCode, Json<CreateBatchResponse>), ServiceError> {
	if body.urls.len() < MIN_BATCH_URLS || body.urls.len() > MAX_BATCH_URLS {
		return Err(ServiceError::Validation(format!("batch must contain between {MIN_BATCH_URLS} and {MAX_BATCH_URLS} urls")));
	}

	for url in &body.urls {
		if parse_video_id(url).is_none() {
			return Err(ServiceError::Validation(format!("invalid_url: {url}")));
		}
	}

	let ct = request_ct();
	let (batch, transcripts) = state.core.store.create_batch(&ct, owner, &body.urls).await?;

	for transcript in &transcripts {
		if transcript.status == media_core::model::JobStatus::Pending {
			let job = Job::new(transcript.id, JobKind::TranscriptExtraction { transcript_id: transcript.id });
			submit_job(&state.core.config, &state.jobs.queue, owner, job).await?;
		}
	}

	Ok((StatusCode::ACCEPTED, Json(CreateBatchResponse { batch, transcripts })))
}

#[derive(Debug, Serialize)]
pub struct GetBatchResponse {
	pub batch: media_core::model::Batch,
	pub transcripts: Vec<media_core::model::Transcript>,
}

/// `GET /api/v1/batches/:id` (spec.md §6, §4.7). Self-heals counts via
/// `UpdateBatchCounts` on every read rather than trusting a cached status.
pub async fn get_batch(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<GetBatchResponse>, ServiceError> {
	let ct = request_ct();
	state.core.store.get_batch(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	state.core.store.update_batch_counts(&ct, id).await?;

	let batch = state.core.store.get_batch(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	let transcripts = state.core.store.get_transcripts_by_batch(&ct, id).await?;
	Ok(Json(GetBatchResponse { batch, transcripts }))
}
