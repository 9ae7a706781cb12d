use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_core::model::{AudioTranscription, Batch, BatchStatus, JobStatus, PdfExtraction, Summary, SummaryStatus, Transcript, Webhook, WebhookDelivery};
use media_core::ports::{
	AudioSummaryUpdate, AudioUpdate, BatchCounts, ListParams, NewAudioTranscription, NewSummary, NewTranscript, NewWebhook, Store, TranscriptUpdate,
};
use media_core::ServiceError;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, SqlitePool, Type};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::convert::{
	audio_content_type_from_str, audio_content_type_to_str, batch_status_from_str, batch_status_to_str, delivery_status_from_str, delivery_status_to_str, job_status_from_str, job_status_to_str,
	json_string_list, parse_string_list, summary_length_from_str, summary_length_to_str, summary_status_from_str, summary_status_to_str, summary_style_from_str, summary_style_to_str,
};

/// `sqlx::SqlitePool`-backed implementation of the persistence port (C1,
/// spec.md §4.1). Pool sizing follows spec.md §5's "tolerate a serverless
/// database's aggressive idle-close behavior": a short `max_lifetime`
/// recycles connections before the backend can drop them out from under us.
pub struct SqliteStore {
	pool: SqlitePool,
}

impl SqliteStore {
	/// # Errors
	/// Returns [`ServiceError::Sqlx`] if the pool cannot connect or
	/// migrations fail to apply.
	pub async fn connect(database_url: &str) -> Result<Self, ServiceError> {
		let pool = SqlitePoolOptions::new()
			.max_connections(10)
			.min_connections(2)
			.acquire_timeout(std::time::Duration::from_secs(5))
			.idle_timeout(Some(std::time::Duration::from_secs(120)))
			.max_lifetime(Some(std::time::Duration::from_secs(120)))
			.connect(database_url)
			.await?;

		sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| ServiceError::Internal(format!("migration failed: {e}")))?;

		tracing::info!("connected to store and applied migrations");
		Ok(Self { pool })
	}

	#[must_use]
	pub const fn from_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[must_use]
	pub const fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

/// Races a query future against the caller's cancellation token
/// (spec.md §4.1: "every operation accepts a cancellation token... and must
/// honor it by aborting in-flight work").
async fn cancellable<T, Fut>(ct: &CancellationToken, fut: Fut) -> Result<T, ServiceError>
where
	Fut: Future<Output = Result<T, sqlx::Error>>,
{
	tokio::select! {
		biased;
		() = ct.cancelled() => Err(ServiceError::Internal("operation cancelled".to_string())),
		res = fut => res.map_err(ServiceError::from),
	}
}

fn col<'r, T>(row: &'r SqliteRow, name: &'static str) -> Result<T, ServiceError>
where
	T: Decode<'r, Sqlite> + Type<Sqlite>,
{
	row.try_get(name).map_err(ServiceError::from)
}

fn parse_uuid(raw: &str) -> Result<Uuid, ServiceError> {
	Uuid::parse_str(raw).map_err(|e| ServiceError::Internal(format!("corrupt uuid in store: {e}")))
}

fn parse_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, ServiceError> {
	raw.map(|s| parse_uuid(&s)).transpose()
}

fn parse_dt(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
	DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| ServiceError::Internal(format!("corrupt timestamp in store: {e}")))
}

fn now_str() -> String {
	Utc::now().to_rfc3339()
}

fn transcript_from_row(row: &SqliteRow) -> Result<Transcript, ServiceError> {
	Ok(Transcript {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		youtube_url: col(row, "youtube_url")?,
		youtube_id: col(row, "youtube_id")?,
		title: col(row, "title")?,
		channel_name: col(row, "channel_name")?,
		duration_seconds: col(row, "duration_seconds")?,
		language: col(row, "language")?,
		text: col(row, "text")?,
		word_count: col(row, "word_count")?,
		status: job_status_from_str(&col::<String>(row, "status")?)?,
		error_message: col(row, "error_message")?,
		batch_id: parse_opt_uuid(col(row, "batch_id")?)?,
		owner_key_id: parse_opt_uuid(col(row, "owner_key_id")?)?,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
		updated_at: parse_dt(&col::<String>(row, "updated_at")?)?,
	})
}

fn audio_from_row(row: &SqliteRow) -> Result<AudioTranscription, ServiceError> {
	Ok(AudioTranscription {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		filename: col(row, "filename")?,
		original_name: col(row, "original_name")?,
		duration_seconds: col(row, "duration_seconds")?,
		language: col(row, "language")?,
		text: col(row, "text")?,
		word_count: col(row, "word_count")?,
		status: job_status_from_str(&col::<String>(row, "status")?)?,
		error_message: col(row, "error_message")?,
		content_type: audio_content_type_from_str(&col::<String>(row, "content_type")?)?,
		summary_text: col(row, "summary_text")?,
		key_points: parse_string_list(&col::<String>(row, "key_points")?),
		action_items: parse_string_list(&col::<String>(row, "action_items")?),
		decisions: parse_string_list(&col::<String>(row, "decisions")?),
		summary_model: col(row, "summary_model")?,
		summary_status: summary_status_from_str(&col::<String>(row, "summary_status")?)?,
		owner_key_id: parse_opt_uuid(col(row, "owner_key_id")?)?,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
		updated_at: parse_dt(&col::<String>(row, "updated_at")?)?,
	})
}

fn pdf_from_row(row: &SqliteRow) -> Result<PdfExtraction, ServiceError> {
	Ok(PdfExtraction {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		filename: col(row, "filename")?,
		original_name: col(row, "original_name")?,
		text: col(row, "text")?,
		word_count: col(row, "word_count")?,
		status: job_status_from_str(&col::<String>(row, "status")?)?,
		error_message: col(row, "error_message")?,
		owner_key_id: parse_opt_uuid(col(row, "owner_key_id")?)?,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
	})
}

fn summary_from_row(row: &SqliteRow) -> Result<Summary, ServiceError> {
	Ok(Summary {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		transcript_id: parse_uuid(&col::<String>(row, "transcript_id")?)?,
		model_used: col(row, "model_used")?,
		prompt_used: col(row, "prompt_used")?,
		summary_text: col(row, "summary_text")?,
		key_points: parse_string_list(&col::<String>(row, "key_points")?),
		length: summary_length_from_str(&col::<String>(row, "length")?)?,
		style: summary_style_from_str(&col::<String>(row, "style")?)?,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
	})
}

fn batch_from_row(row: &SqliteRow) -> Result<Batch, ServiceError> {
	Ok(Batch {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		status: batch_status_from_str(&col::<String>(row, "status")?)?,
		total_count: col(row, "total_count")?,
		completed_count: col(row, "completed_count")?,
		failed_count: col(row, "failed_count")?,
		owner_key_id: parse_opt_uuid(col(row, "owner_key_id")?)?,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
	})
}

fn webhook_from_row(row: &SqliteRow) -> Result<Webhook, ServiceError> {
	Ok(Webhook {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		owner_key_id: parse_uuid(&col::<String>(row, "owner_key_id")?)?,
		url: col(row, "url")?,
		events: parse_string_list(&col::<String>(row, "events")?),
		secret: col(row, "secret")?,
		active: col::<i64>(row, "active")? != 0,
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
	})
}

fn delivery_from_row(row: &SqliteRow) -> Result<WebhookDelivery, ServiceError> {
	let payload_raw: String = col(row, "payload")?;
	Ok(WebhookDelivery {
		id: parse_uuid(&col::<String>(row, "id")?)?,
		webhook_id: parse_uuid(&col::<String>(row, "webhook_id")?)?,
		event: col(row, "event")?,
		payload: serde_json::from_str(&payload_raw).unwrap_or(serde_json::Value::Null),
		status: delivery_status_from_str(&col::<String>(row, "status")?)?,
		attempts: u32::try_from(col::<i64>(row, "attempts")?).unwrap_or(0),
		last_error: col(row, "last_error")?,
		response_code: col::<Option<i64>>(row, "response_code")?.map(|c| u16::try_from(c).unwrap_or(0)),
		created_at: parse_dt(&col::<String>(row, "created_at")?)?,
		delivered_at: col::<Option<String>>(row, "delivered_at")?.map(|s| parse_dt(&s)).transpose()?,
	})
}

#[async_trait]
impl Store for SqliteStore {
	async fn create_transcript(&self, ct: &CancellationToken, new: NewTranscript) -> Result<Transcript, ServiceError> {
		let id = Uuid::new_v4();
		let now = now_str();
		cancellable(
			ct,
			sqlx::query("INSERT INTO transcripts (id, youtube_url, youtube_id, status, error_message, batch_id, owner_key_id, created_at, updated_at) VALUES (?, ?, ?, 'pending', '', ?, ?, ?, ?)")
				.bind(id.to_string())
				.bind(&new.youtube_url)
				.bind(&new.youtube_id)
				.bind(new.batch_id.map(|b| b.to_string()))
				.bind(new.owner_key_id.map(|o| o.to_string()))
				.bind(&now)
				.bind(&now)
				.execute(&self.pool),
		)
		.await?;

		self.get_transcript(ct, id).await?.ok_or_else(|| ServiceError::Internal("transcript vanished after insert".to_string()))
	}

	async fn get_transcript(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<Transcript>, ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM transcripts WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		row.as_ref().map(transcript_from_row).transpose()
	}

	async fn get_transcript_by_youtube_id(&self, ct: &CancellationToken, youtube_id: &str) -> Result<Option<Transcript>, ServiceError> {
		let row = cancellable(
			ct,
			sqlx::query("SELECT * FROM transcripts WHERE youtube_id = ? AND status = 'completed' ORDER BY created_at DESC LIMIT 1")
				.bind(youtube_id)
				.fetch_optional(&self.pool),
		)
		.await?;
		row.as_ref().map(transcript_from_row).transpose()
	}

	async fn update_transcript(&self, ct: &CancellationToken, id: Uuid, update: TranscriptUpdate) -> Result<Transcript, ServiceError> {
		let now = now_str();
		cancellable(
			ct,
			sqlx::query(
				"UPDATE transcripts SET \
				 status = COALESCE(?, status), \
				 title = COALESCE(?, title), \
				 channel_name = COALESCE(?, channel_name), \
				 duration_seconds = COALESCE(?, duration_seconds), \
				 language = COALESCE(?, language), \
				 text = COALESCE(?, text), \
				 word_count = COALESCE(?, word_count), \
				 error_message = COALESCE(?, error_message), \
				 updated_at = ? \
				 WHERE id = ?",
			)
			.bind(update.status.map(job_status_to_str))
			.bind(update.title)
			.bind(update.channel_name)
			.bind(update.duration_seconds)
			.bind(update.language)
			.bind(update.text)
			.bind(update.word_count)
			.bind(update.error_message)
			.bind(&now)
			.bind(id.to_string())
			.execute(&self.pool),
		)
		.await?;

		self.get_transcript(ct, id).await?.ok_or(ServiceError::NotFound)
	}

	async fn delete_transcript(&self, ct: &CancellationToken, id: Uuid, requester: Option<Uuid>) -> Result<(), ServiceError> {
		let existing = self.get_transcript(ct, id).await?.ok_or(ServiceError::NotFound)?;
		if existing.owner_key_id.is_some() && existing.owner_key_id != requester {
			return Err(ServiceError::Unauthorized);
		}
		cancellable(ct, sqlx::query("DELETE FROM transcripts WHERE id = ?").bind(id.to_string()).execute(&self.pool)).await?;
		Ok(())
	}

	async fn list_transcripts(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<Transcript>, ServiceError> {
		let params = params.normalize(media_core::ports::TRANSCRIPT_SORT_COLUMNS);
		let mut qb = sqlx::QueryBuilder::new("SELECT * FROM transcripts WHERE 1 = 1");
		if let Some(status) = params.filters.get("status") {
			qb.push(" AND status = ").push_bind(status.clone());
		}
		if let Some(batch_id) = params.filters.get("batch_id") {
			qb.push(" AND batch_id = ").push_bind(batch_id.clone());
		}
		if let Some(owner) = params.filters.get("owner_key_id") {
			qb.push(" AND owner_key_id = ").push_bind(owner.clone());
		}
		// sort_by passed `normalize`'s allow-list check above, so it is safe
		// to interpolate as an identifier (spec.md §4.1: block SQL
		// injection via an allow-list, not via binding — column names
		// cannot be bind parameters).
		qb.push(format!(" ORDER BY {} {}", params.sort_by, params.sort_dir.as_sql()));
		qb.push(" LIMIT ").push_bind(params.limit());
		qb.push(" OFFSET ").push_bind(params.offset());

		let rows = cancellable(ct, qb.build().fetch_all(&self.pool)).await?;
		rows.iter().map(transcript_from_row).collect()
	}

	async fn create_audio_transcription(&self, ct: &CancellationToken, new: NewAudioTranscription) -> Result<AudioTranscription, ServiceError> {
		let id = Uuid::new_v4();
		let now = now_str();
		cancellable(
			ct,
			sqlx::query(
				"INSERT INTO audio_transcriptions (id, filename, original_name, status, error_message, content_type, owner_key_id, created_at, updated_at) \
				 VALUES (?, ?, ?, 'pending', '', ?, ?, ?, ?)",
			)
			.bind(id.to_string())
			.bind(&new.filename)
			.bind(&new.original_name)
			.bind(audio_content_type_to_str(new.content_type))
			.bind(new.owner_key_id.map(|o| o.to_string()))
			.bind(&now)
			.bind(&now)
			.execute(&self.pool),
		)
		.await?;

		self.get_audio_transcription(ct, id).await?.ok_or_else(|| ServiceError::Internal("audio transcription vanished after insert".to_string()))
	}

	async fn get_audio_transcription(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<AudioTranscription>, ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM audio_transcriptions WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		row.as_ref().map(audio_from_row).transpose()
	}

	async fn update_audio_transcription(&self, ct: &CancellationToken, id: Uuid, update: AudioUpdate) -> Result<AudioTranscription, ServiceError> {
		let now = now_str();
		cancellable(
			ct,
			sqlx::query(
				"UPDATE audio_transcriptions SET \
				 status = COALESCE(?, status), \
				 duration_seconds = COALESCE(?, duration_seconds), \
				 language = COALESCE(?, language), \
				 text = COALESCE(?, text), \
				 word_count = COALESCE(?, word_count), \
				 error_message = COALESCE(?, error_message), \
				 updated_at = ? \
				 WHERE id = ?",
			)
			.bind(update.status.map(job_status_to_str))
			.bind(update.duration_seconds)
			.bind(update.language)
			.bind(update.text)
			.bind(update.word_count)
			.bind(update.error_message)
			.bind(&now)
			.bind(id.to_string())
			.execute(&self.pool),
		)
		.await?;

		self.get_audio_transcription(ct, id).await?.ok_or(ServiceError::NotFound)
	}

	async fn update_audio_summary(&self, ct: &CancellationToken, id: Uuid, update: AudioSummaryUpdate) -> Result<AudioTranscription, ServiceError> {
		let now = now_str();
		cancellable(
			ct,
			sqlx::query(
				"UPDATE audio_transcriptions SET \
				 summary_status = ?, summary_text = COALESCE(?, summary_text), key_points = ?, action_items = ?, decisions = ?, \
				 summary_model = COALESCE(?, summary_model), updated_at = ? \
				 WHERE id = ?",
			)
			.bind(summary_status_to_str(update.summary_status))
			.bind(update.summary_text)
			.bind(json_string_list(&update.key_points))
			.bind(json_string_list(&update.action_items))
			.bind(json_string_list(&update.decisions))
			.bind(update.summary_model)
			.bind(&now)
			.bind(id.to_string())
			.execute(&self.pool),
		)
		.await?;

		self.get_audio_transcription(ct, id).await?.ok_or(ServiceError::NotFound)
	}

	async fn list_audio_transcriptions(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError> {
		const ALLOWED: &[&str] = &["created_at", "updated_at", "status", "duration_seconds"];
		let params = params.normalize(ALLOWED);
		let mut qb = sqlx::QueryBuilder::new("SELECT * FROM audio_transcriptions WHERE 1 = 1");
		if let Some(status) = params.filters.get("status") {
			qb.push(" AND status = ").push_bind(status.clone());
		}
		if let Some(owner) = params.filters.get("owner_key_id") {
			qb.push(" AND owner_key_id = ").push_bind(owner.clone());
		}
		qb.push(format!(" ORDER BY {} {}", params.sort_by, params.sort_dir.as_sql()));
		qb.push(" LIMIT ").push_bind(params.limit());
		qb.push(" OFFSET ").push_bind(params.offset());

		let rows = cancellable(ct, qb.build().fetch_all(&self.pool)).await?;
		rows.iter().map(audio_from_row).collect()
	}

	async fn search_audio_transcriptions(&self, ct: &CancellationToken, query: &str, params: ListParams) -> Result<Vec<AudioTranscription>, ServiceError> {
		const ALLOWED: &[&str] = &["created_at", "updated_at", "status"];
		let params = params.normalize(ALLOWED);
		let like = format!("%{query}%");
		let mut qb = sqlx::QueryBuilder::new("SELECT * FROM audio_transcriptions WHERE (text LIKE ");
		qb.push_bind(like.clone());
		qb.push(" OR original_name LIKE ");
		qb.push_bind(like);
		qb.push(")");
		qb.push(format!(" ORDER BY {} {}", params.sort_by, params.sort_dir.as_sql()));
		qb.push(" LIMIT ").push_bind(params.limit());
		qb.push(" OFFSET ").push_bind(params.offset());

		let rows = cancellable(ct, qb.build().fetch_all(&self.pool)).await?;
		rows.iter().map(audio_from_row).collect()
	}

	async fn create_pdf_extraction(&self, ct: &CancellationToken, record: PdfExtraction) -> Result<PdfExtraction, ServiceError> {
		cancellable(
			ct,
			sqlx::query("INSERT INTO pdf_extractions (id, filename, original_name, text, word_count, status, error_message, owner_key_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
				.bind(record.id.to_string())
				.bind(&record.filename)
				.bind(&record.original_name)
				.bind(&record.text)
				.bind(record.word_count)
				.bind(job_status_to_str(record.status))
				.bind(&record.error_message)
				.bind(record.owner_key_id.map(|o| o.to_string()))
				.bind(record.created_at.to_rfc3339())
				.execute(&self.pool),
		)
		.await?;
		Ok(record)
	}

	async fn get_pdf_extraction(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<PdfExtraction>, ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM pdf_extractions WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		row.as_ref().map(pdf_from_row).transpose()
	}

	async fn list_pdf_extractions(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<PdfExtraction>, ServiceError> {
		const ALLOWED: &[&str] = &["created_at", "status"];
		let params = params.normalize(ALLOWED);
		let mut qb = sqlx::QueryBuilder::new("SELECT * FROM pdf_extractions WHERE 1 = 1");
		if let Some(owner) = params.filters.get("owner_key_id") {
			qb.push(" AND owner_key_id = ").push_bind(owner.clone());
		}
		qb.push(format!(" ORDER BY {} {}", params.sort_by, params.sort_dir.as_sql()));
		qb.push(" LIMIT ").push_bind(params.limit());
		qb.push(" OFFSET ").push_bind(params.offset());

		let rows = cancellable(ct, qb.build().fetch_all(&self.pool)).await?;
		rows.iter().map(pdf_from_row).collect()
	}

	async fn delete_pdf_extraction(&self, ct: &CancellationToken, id: Uuid, requester: Option<Uuid>) -> Result<(), ServiceError> {
		let existing = self.get_pdf_extraction(ct, id).await?.ok_or(ServiceError::NotFound)?;
		if existing.owner_key_id.is_some() && existing.owner_key_id != requester {
			return Err(ServiceError::Unauthorized);
		}
		cancellable(ct, sqlx::query("DELETE FROM pdf_extractions WHERE id = ?").bind(id.to_string()).execute(&self.pool)).await?;
		Ok(())
	}

	async fn create_summary(&self, ct: &CancellationToken, new: NewSummary) -> Result<Summary, ServiceError> {
		let id = Uuid::new_v4();
		let now = now_str();
		cancellable(
			ct,
			sqlx::query("INSERT INTO summaries (id, transcript_id, model_used, prompt_used, summary_text, key_points, length, style, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
				.bind(id.to_string())
				.bind(new.transcript_id.to_string())
				.bind(&new.model_used)
				.bind(&new.prompt_used)
				.bind(&new.summary_text)
				.bind(json_string_list(&new.key_points))
				.bind(summary_length_to_str(new.length))
				.bind(summary_style_to_str(new.style))
				.bind(&now)
				.execute(&self.pool),
		)
		.await?;

		let row = cancellable(ct, sqlx::query("SELECT * FROM summaries WHERE id = ?").bind(id.to_string()).fetch_one(&self.pool)).await?;
		summary_from_row(&row)
	}

	async fn get_summaries_by_transcript(&self, ct: &CancellationToken, transcript_id: Uuid) -> Result<Vec<Summary>, ServiceError> {
		let rows = cancellable(
			ct,
			sqlx::query("SELECT * FROM summaries WHERE transcript_id = ? ORDER BY created_at ASC").bind(transcript_id.to_string()).fetch_all(&self.pool),
		)
		.await?;
		rows.iter().map(summary_from_row).collect()
	}

	async fn create_batch(&self, ct: &CancellationToken, owner_key_id: Option<Uuid>, urls: &[String]) -> Result<(Batch, Vec<Transcript>), ServiceError> {
		let batch_id = Uuid::new_v4();
		let now = now_str();
		let mut tx = cancellable(ct, self.pool.begin()).await?;

		sqlx::query("INSERT INTO batches (id, status, total_count, completed_count, failed_count, owner_key_id, created_at) VALUES (?, 'processing', ?, 0, 0, ?, ?)")
			.bind(batch_id.to_string())
			.bind(i64::try_from(urls.len()).unwrap_or(i64::MAX))
			.bind(owner_key_id.map(|o| o.to_string()))
			.bind(&now)
			.execute(&mut *tx)
			.await?;

		let mut transcripts = Vec::with_capacity(urls.len());
		for url in urls {
			let youtube_id = media_core::parse_video_id(url).ok_or_else(|| ServiceError::Validation(format!("invalid youtube url: {url}")))?;
			let transcript_id = Uuid::new_v4();

			// Soft dedup within a batch (spec.md §3 invariant (c)): if a
			// completed transcript already exists for this youtube_id, the
			// new row is still created (batch membership is preserved) but
			// pre-populated from the existing one instead of staying pending.
			let existing = sqlx::query("SELECT * FROM transcripts WHERE youtube_id = ? AND status = 'completed' ORDER BY created_at DESC LIMIT 1")
				.bind(&youtube_id)
				.fetch_optional(&mut *tx)
				.await?;

			if let Some(existing_row) = existing {
				let existing = transcript_from_row(&existing_row)?;
				sqlx::query(
					"INSERT INTO transcripts (id, youtube_url, youtube_id, title, channel_name, duration_seconds, language, text, word_count, status, error_message, batch_id, owner_key_id, created_at, updated_at) \
					 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'completed', '', ?, ?, ?, ?)",
				)
				.bind(transcript_id.to_string())
				.bind(url)
				.bind(&youtube_id)
				.bind(&existing.title)
				.bind(&existing.channel_name)
				.bind(existing.duration_seconds)
				.bind(&existing.language)
				.bind(&existing.text)
				.bind(existing.word_count)
				.bind(batch_id.to_string())
				.bind(owner_key_id.map(|o| o.to_string()))
				.bind(&now)
				.bind(&now)
				.execute(&mut *tx)
				.await?;
			} else {
				sqlx::query("INSERT INTO transcripts (id, youtube_url, youtube_id, status, error_message, batch_id, owner_key_id, created_at, updated_at) VALUES (?, ?, ?, 'pending', '', ?, ?, ?, ?)")
					.bind(transcript_id.to_string())
					.bind(url)
					.bind(&youtube_id)
					.bind(batch_id.to_string())
					.bind(owner_key_id.map(|o| o.to_string()))
					.bind(&now)
					.bind(&now)
					.execute(&mut *tx)
					.await?;
			}

			let row = sqlx::query("SELECT * FROM transcripts WHERE id = ?").bind(transcript_id.to_string()).fetch_one(&mut *tx).await?;
			transcripts.push(transcript_from_row(&row)?);
		}

		tx.commit().await?;

		let batch = self.get_batch(ct, batch_id).await?.ok_or_else(|| ServiceError::Internal("batch vanished after insert".to_string()))?;
		Ok((batch, transcripts))
	}

	async fn get_batch(&self, ct: &CancellationToken, id: Uuid) -> Result<Option<Batch>, ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM batches WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		row.as_ref().map(batch_from_row).transpose()
	}

	async fn get_transcripts_by_batch(&self, ct: &CancellationToken, batch_id: Uuid) -> Result<Vec<Transcript>, ServiceError> {
		let rows = cancellable(ct, sqlx::query("SELECT * FROM transcripts WHERE batch_id = ? ORDER BY created_at ASC").bind(batch_id.to_string()).fetch_all(&self.pool)).await?;
		rows.iter().map(transcript_from_row).collect()
	}

	async fn create_transcript_with_batch(&self, ct: &CancellationToken, batch_id: Uuid, new: NewTranscript) -> Result<Transcript, ServiceError> {
		self.create_transcript(ct, NewTranscript { batch_id: Some(batch_id), ..new }).await
	}

	/// Single atomic statement deriving batch counts and status from child
	/// transcripts (spec.md §4.1's truth table). An empty batch (no
	/// children at all) is treated as `completed`: the table doesn't name
	/// that case explicitly, and a batch that was never populated cannot
	/// meaningfully be "processing" (see DESIGN.md).
	async fn update_batch_counts(&self, ct: &CancellationToken, batch_id: Uuid) -> Result<BatchCounts, ServiceError> {
		let id = batch_id.to_string();
		cancellable(
			ct,
			sqlx::query(
				"UPDATE batches SET \
				 total_count = (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1), \
				 completed_count = (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1 AND status = 'completed'), \
				 failed_count = (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1 AND status = 'failed'), \
				 status = CASE \
				   WHEN (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1 AND status IN ('pending', 'processing')) > 0 THEN 'processing' \
				   WHEN (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1 AND status = 'failed') > 0 \
				        AND (SELECT COUNT(*) FROM transcripts WHERE batch_id = ?1 AND status = 'completed') = 0 THEN 'failed' \
				   ELSE 'completed' \
				 END \
				 WHERE id = ?1",
			)
			.bind(&id)
			.execute(&self.pool),
		)
		.await?;

		let batch = self.get_batch(ct, batch_id).await?.ok_or(ServiceError::NotFound)?;
		let reached_terminal = batch.total_count - batch.completed_count - batch.failed_count == 0;
		Ok(BatchCounts {
			total: batch.total_count,
			completed: batch.completed_count,
			failed: batch.failed_count,
			reached_terminal,
		})
	}

	async fn create_webhook(&self, ct: &CancellationToken, new: NewWebhook) -> Result<Webhook, ServiceError> {
		let id = Uuid::new_v4();
		let now = now_str();
		cancellable(
			ct,
			sqlx::query("INSERT INTO webhooks (id, owner_key_id, url, events, secret, active, created_at) VALUES (?, ?, ?, ?, ?, 1, ?)")
				.bind(id.to_string())
				.bind(new.owner_key_id.to_string())
				.bind(&new.url)
				.bind(json_string_list(&new.events))
				.bind(&new.secret)
				.bind(&now)
				.execute(&self.pool),
		)
		.await?;

		let row = cancellable(ct, sqlx::query("SELECT * FROM webhooks WHERE id = ?").bind(id.to_string()).fetch_one(&self.pool)).await?;
		webhook_from_row(&row)
	}

	async fn get_active_webhooks_for_event(&self, ct: &CancellationToken, event: &str) -> Result<Vec<Webhook>, ServiceError> {
		let rows = cancellable(ct, sqlx::query("SELECT * FROM webhooks WHERE active = 1").fetch_all(&self.pool)).await?;
		rows.iter()
			.map(webhook_from_row)
			.collect::<Result<Vec<_>, _>>()
			.map(|all| all.into_iter().filter(|w| w.events.iter().any(|e| e == event)).collect())
	}

	async fn update_webhook_active(&self, ct: &CancellationToken, id: Uuid, owner_key_id: Uuid, active: bool) -> Result<Webhook, ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM webhooks WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		let existing = row.as_ref().map(webhook_from_row).transpose()?.ok_or(ServiceError::NotFound)?;
		if existing.owner_key_id != owner_key_id {
			return Err(ServiceError::Unauthorized);
		}

		cancellable(ct, sqlx::query("UPDATE webhooks SET active = ? WHERE id = ?").bind(active).bind(id.to_string()).execute(&self.pool)).await?;

		let row = cancellable(ct, sqlx::query("SELECT * FROM webhooks WHERE id = ?").bind(id.to_string()).fetch_one(&self.pool)).await?;
		webhook_from_row(&row)
	}

	async fn delete_webhook(&self, ct: &CancellationToken, id: Uuid, owner_key_id: Uuid) -> Result<(), ServiceError> {
		let row = cancellable(ct, sqlx::query("SELECT * FROM webhooks WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool)).await?;
		let existing = row.as_ref().map(webhook_from_row).transpose()?.ok_or(ServiceError::NotFound)?;
		if existing.owner_key_id != owner_key_id {
			return Err(ServiceError::Unauthorized);
		}
		cancellable(ct, sqlx::query("DELETE FROM webhooks WHERE id = ?").bind(id.to_string()).execute(&self.pool)).await?;
		Ok(())
	}

	async fn list_webhooks_by_owner(&self, ct: &CancellationToken, owner_key_id: Uuid) -> Result<Vec<Webhook>, ServiceError> {
		let rows = cancellable(
			ct,
			sqlx::query("SELECT * FROM webhooks WHERE owner_key_id = ? ORDER BY created_at DESC").bind(owner_key_id.to_string()).fetch_all(&self.pool),
		)
		.await?;
		rows.iter().map(webhook_from_row).collect()
	}

	async fn create_webhook_delivery(&self, ct: &CancellationToken, webhook_id: Uuid, event: &str, payload: serde_json::Value) -> Result<WebhookDelivery, ServiceError> {
		let id = Uuid::new_v4();
		let now = now_str();
		cancellable(
			ct,
			sqlx::query("INSERT INTO webhook_deliveries (id, webhook_id, event, payload, status, attempts, created_at) VALUES (?, ?, ?, ?, 'pending', 0, ?)")
				.bind(id.to_string())
				.bind(webhook_id.to_string())
				.bind(event)
				.bind(payload.to_string())
				.bind(&now)
				.execute(&self.pool),
		)
		.await?;

		let row = cancellable(ct, sqlx::query("SELECT * FROM webhook_deliveries WHERE id = ?").bind(id.to_string()).fetch_one(&self.pool)).await?;
		delivery_from_row(&row)
	}

	async fn update_webhook_delivery(&self, ct: &CancellationToken, delivery: &WebhookDelivery) -> Result<(), ServiceError> {
		cancellable(
			ct,
			sqlx::query("UPDATE webhook_deliveries SET status = ?, attempts = ?, last_error = ?, response_code = ?, delivered_at = ? WHERE id = ?")
				.bind(delivery_status_to_str(delivery.status))
				.bind(i64::from(delivery.attempts))
				.bind(&delivery.last_error)
				.bind(delivery.response_code.map(i64::from))
				.bind(delivery.delivered_at.map(|dt| dt.to_rfc3339()))
				.bind(delivery.id.to_string())
				.execute(&self.pool),
		)
		.await?;
		Ok(())
	}

	async fn list_webhook_deliveries(&self, ct: &CancellationToken, params: ListParams) -> Result<Vec<WebhookDelivery>, ServiceError> {
		const ALLOWED: &[&str] = &["created_at", "status", "attempts"];
		let params = params.normalize(ALLOWED);
		let mut qb = sqlx::QueryBuilder::new("SELECT * FROM webhook_deliveries WHERE 1 = 1");
		if let Some(webhook_id) = params.filters.get("webhook_id") {
			qb.push(" AND webhook_id = ").push_bind(webhook_id.clone());
		}
		if let Some(status) = params.filters.get("status") {
			qb.push(" AND status = ").push_bind(status.clone());
		}
		qb.push(format!(" ORDER BY {} {}", params.sort_by, params.sort_dir.as_sql()));
		qb.push(" LIMIT ").push_bind(params.limit());
		qb.push(" OFFSET ").push_bind(params.offset());

		let rows = cancellable(ct, qb.build().fetch_all(&self.pool)).await?;
		rows.iter().map(delivery_from_row).collect()
	}
}
