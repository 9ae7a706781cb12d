use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::model::{AudioContentType, AudioTranscription, SummaryLength, SummaryStyle};
use media_core::ports::{ListParams, NewAudioTranscription, SortDir};
use media_core::{Job, JobKind, ServiceError};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::OptionalApiKey;
use crate::handlers::{request_ct, submit_job};
use crate::state::AppState;

fn parse_content_type(raw: Option<&str>) -> AudioContentType {
	match raw {
		Some("phone_call") => AudioContentType::PhoneCall,
		Some("meeting") => AudioContentType::Meeting,
		Some("voice_memo") => AudioContentType::VoiceMemo,
		Some("interview") => AudioContentType::Interview,
		Some("lecture") => AudioContentType::Lecture,
		_ => AudioContentType::General,
	}
}

/// `POST /api/v1/audio/transcribe` (spec.md §6): multipart upload of the
/// audio file plus optional `content_type` and `with_summary` fields. 503 if
/// Whisper is unconfigured — there is no point persisting a record destined
/// to fail immediately.
pub async fn transcribe_audio(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, mut multipart: Multipart) -> Result<(StatusCode, Json<AudioTranscription>), ServiceError> {
	if !state.external.whisper.is_configured() {
		return Err(ServiceError::Unconfigured("whisper".to_string()));
	}

	let ct = request_ct();

	let mut original_name = None;
	let mut bytes = None;
	let mut content_type = AudioContentType::General;
	let mut with_summary = false;

	while let Some(field) = multipart.next_field().await.map_err(|e| ServiceError::Validation(e.to_string()))? {
		match field.name() {
			Some("file") => {
				original_name = field.file_name().map(ToString::to_string);
				bytes = Some(field.bytes().await.map_err(|e| ServiceError::Validation(e.to_string()))?);
			}
			Some("content_type") => {
				let text = field.text().await.map_err(|e| ServiceError::Validation(e.to_string()))?;
				content_type = parse_content_type(Some(&text));
			}
			Some("with_summary") => {
				let text = field.text().await.map_err(|e| ServiceError::Validation(e.to_string()))?;
				with_summary = text.eq_ignore_ascii_case("true") || text == "1";
			}
			_ => {}
		}
	}

	let bytes = bytes.ok_or_else(|| ServiceError::Validation("multipart field 'file' is required".to_string()))?;
	if bytes.len() > state.core.config.max_upload_bytes {
		return Err(ServiceError::Validation("file exceeds max_upload_bytes".to_string()));
	}

	let original_name = original_name.unwrap_or_else(|| "upload.audio".to_string());
	let stored_name = format!("{}.audio", Uuid::new_v4());
	state.external.blobs.write(&ct, &stored_name, bytes.to_vec()).await?;

	let audio = state
		.core
		.store
		.create_audio_transcription(
			&ct,
			NewAudioTranscription {
				filename: stored_name,
				original_name,
				content_type,
				owner_key_id: owner,
			},
		)
		.await?;

	let job = Job::new(audio.id, JobKind::AudioTranscription { audio_id: audio.id, with_summary, content_type });
	submit_job(&state.core.config, &state.jobs.queue, owner, job).await?;

	Ok((StatusCode::ACCEPTED, Json(audio)))
}

pub async fn get_audio_transcription(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<AudioTranscription>, ServiceError> {
	let ct = request_ct();
	let audio = state.core.store.get_audio_transcription(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	Ok(Json(audio))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
	pub page: Option<u32>,
	pub per_page: Option<u32>,
	pub sort_by: Option<String>,
	pub sort_dir: Option<String>,
}

const AUDIO_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "status"];

pub async fn list_audio_transcriptions(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Query(query): Query<ListQuery>) -> Result<Json<Vec<AudioTranscription>>, ServiceError> {
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
	.normalize(AUDIO_SORT_COLUMNS);

	let audio = state.core.store.list_audio_transcriptions(&ct, params).await?;
	Ok(Json(audio))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
	pub q: String,
	pub page: Option<u32>,
	pub per_page: Option<u32>,
}

pub async fn search_audio_transcriptions(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Json<Vec<AudioTranscription>>, ServiceError> {
	let ct = request_ct();
	let params = ListParams {
		page: query.page.unwrap_or(1),
		per_page: query.per_page.unwrap_or(20),
		..Default::default()
	}
	.normalize(AUDIO_SORT_COLUMNS);

	let audio = state.core.store.search_audio_transcriptions(&ct, &query.q, params).await?;
	Ok(Json(audio))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeAudioRequest {
	pub content_type: Option<String>,
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

/// `POST /api/v1/audio/transcriptions/:id/summarize` (spec.md §6). Requires
/// the audio to already be `completed` with text — enforced by the executor
/// (`media_executors::audio::run_summary`), not here, since the record might
/// still transition between this check and the worker picking the job up.
pub async fn summarize_audio(
	State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Path(id): Path<Uuid>, Json(body): Json<SummarizeAudioRequest>,
) -> Result<(StatusCode, Json<AudioTranscription>), ServiceError> {
	if !state.external.summarizer.is_configured() {
		return Err(ServiceError::Unconfigured("summarizer".to_string()));
	}

	let ct = request_ct();
	let audio = state.core.store.get_audio_transcription(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	if audio.status != media_core::model::JobStatus::Completed || audio.text.is_none() {
		return Err(ServiceError::Conflict("transcript_not_ready".to_string()));
	}

	let content_type = body.content_type.as_deref().map_or(audio.content_type, |_| parse_content_type(body.content_type.as_deref()));
	let length = parse_length(body.length.as_deref());
	let style = parse_style(body.style.as_deref());

	let updated = state
		.core
		.store
		.update_audio_summary(&ct, id, media_core::ports::AudioSummaryUpdate { summary_status: media_core::model::SummaryStatus::Processing, ..Default::default() })
		.await?;

	let job = Job::new(
		id,
		JobKind::AudioSummaryGeneration {
			audio_id: id,
			content_type,
			length,
			style,
			model_override: body.model.clone(),
		},
	);
	submit_job(&state.core.config, &state.jobs.queue, owner, job).await?;

	Ok((StatusCode::ACCEPTED, Json(updated)))
}
