use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use media_core::model::{JobStatus, PdfExtraction};
use media_core::ports::{ListParams, PdfExtractor};
use media_core::ServiceError;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::OptionalApiKey;
use crate::handlers::request_ct;
use crate::state::AppState;

/// `POST /api/v1/pdf/extract` (spec.md §6). Synchronous — there is no
/// pending state for a PDF extraction (spec.md §3), so the record is
/// created already `completed` or `failed` and handed back in the same
/// response, with no job ever touching C5/C6.
pub async fn extract_pdf(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, mut multipart: Multipart) -> Result<(StatusCode, Json<PdfExtraction>), ServiceError> {
	let ct = request_ct();

	let mut filename = None;
	let mut bytes = None;
	while let Some(field) = multipart.next_field().await.map_err(|e| ServiceError::Validation(e.to_string()))? {
		if field.name() == Some("file") {
			filename = field.file_name().map(ToString::to_string);
			bytes = Some(field.bytes().await.map_err(|e| ServiceError::Validation(e.to_string()))?);
		}
	}

	let bytes = bytes.ok_or_else(|| ServiceError::Validation("multipart field 'file' is required".to_string()))?;
	if bytes.len() > state.core.config.max_upload_bytes {
		return Err(ServiceError::Validation("file exceeds max_upload_bytes".to_string()));
	}

	let original_name = filename.unwrap_or_else(|| "upload.pdf".to_string());
	let stored_name = format!("{}.pdf", Uuid::new_v4());
	state.external.blobs.write(&ct, &stored_name, bytes.to_vec()).await?;

	let pdf = Arc::clone(&state.external.pdf);
	let extraction = tokio::task::spawn_blocking(move || pdf.extract(&bytes)).await.map_err(|e| ServiceError::Internal(e.to_string()))?;

	let record = match extraction {
		Ok(extracted) => PdfExtraction {
			id: Uuid::new_v4(),
			filename: stored_name,
			original_name,
			text: Some(extracted.text),
			word_count: Some(extracted.word_count),
			status: JobStatus::Completed,
			error_message: String::new(),
			owner_key_id: owner,
			created_at: Utc::now(),
		},
		Err(error) => PdfExtraction {
			id: Uuid::new_v4(),
			filename: stored_name,
			original_name,
			text: None,
			word_count: None,
			status: JobStatus::Failed,
			error_message: error.to_string(),
			owner_key_id: owner,
			created_at: Utc::now(),
		},
	};

	let saved = state.core.store.create_pdf_extraction(&ct, record).await?;
	Ok((StatusCode::OK, Json(saved)))
}

pub async fn get_pdf_extraction(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<PdfExtraction>, ServiceError> {
	let ct = request_ct();
	let extraction = state.core.store.get_pdf_extraction(&ct, id).await?.ok_or(ServiceError::NotFound)?;
	Ok(Json(extraction))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
	pub page: Option<u32>,
	pub per_page: Option<u32>,
	pub sort_by: Option<String>,
	pub sort_dir: Option<String>,
}

const PDF_SORT_COLUMNS: &[&str] = &["created_at", "status"];

pub async fn list_pdf_extractions(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Query(query): Query<ListQuery>) -> Result<Json<Vec<PdfExtraction>>, ServiceError> {
	let ct = request_ct();
	let mut filters = HashMap::new();
	if let Some(owner) = owner {
		filters.insert("owner_key_id".to_string(), owner.to_string());
	}

	let params = ListParams {
		page: query.page.unwrap_or(1),
		per_page: query.per_page.unwrap_or(20),
		sort_by: query.sort_by.unwrap_or_else(|| "created_at".to_string()),
		sort_dir: media_core::ports::SortDir::parse_or_default(query.sort_dir.as_deref()),
		filters,
	}
	.normalize(PDF_SORT_COLUMNS);

	let extractions = state.core.store.list_pdf_extractions(&ct, params).await?;
	Ok(Json(extractions))
}

pub async fn delete_pdf_extraction(State(state): State<AppState>, OptionalApiKey(owner): OptionalApiKey, Path(id): Path<Uuid>) -> Result<StatusCode, ServiceError> {
	let ct = request_ct();
	state.core.store.delete_pdf_extraction(&ct, id, owner).await?;
	Ok(StatusCode::NO_CONTENT)
}
