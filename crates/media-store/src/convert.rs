use media_core::model::{AudioContentType, BatchStatus, DeliveryStatus, JobStatus, SummaryLength, SummaryStatus, SummaryStyle};
use media_core::ServiceError;

/// Hand-rolled string<->enum round-trips for every status/kind column.
///
/// `media-store` reads and writes these as plain `TEXT` (sqlite has no
/// native enum type), so columns are fetched untyped with
/// `Row::try_get::<String, _>` and matched here rather than leaned on
/// `sqlx::Type`'s enum-derive, which is tuned for Postgres-style named
/// types and not worth the risk of a subtly wrong SQLite mapping.
pub fn job_status_to_str(status: JobStatus) -> &'static str {
	match status {
		JobStatus::Pending => "pending",
		JobStatus::Processing => "processing",
		JobStatus::Completed => "completed",
		JobStatus::Failed => "failed",
	}
}

pub fn job_status_from_str(s: &str) -> Result<JobStatus, ServiceError> {
	match s {
		"pending" => Ok(JobStatus::Pending),
		"processing" => Ok(JobStatus::Processing),
		"completed" => Ok(JobStatus::Completed),
		"failed" => Ok(JobStatus::Failed),
		other => Err(ServiceError::Internal(format!("unknown job status in store: {other}"))),
	}
}

pub fn summary_status_to_str(status: SummaryStatus) -> &'static str {
	match status {
		SummaryStatus::None => "none",
		SummaryStatus::Processing => "processing",
		SummaryStatus::Completed => "completed",
		SummaryStatus::Failed => "failed",
	}
}

pub fn summary_status_from_str(s: &str) -> Result<SummaryStatus, ServiceError> {
	match s {
		"none" => Ok(SummaryStatus::None),
		"processing" => Ok(SummaryStatus::Processing),
		"completed" => Ok(SummaryStatus::Completed),
		"failed" => Ok(SummaryStatus::Failed),
		other => Err(ServiceError::Internal(format!("unknown summary status in store: {other}"))),
	}
}

pub fn batch_status_to_str(status: BatchStatus) -> &'static str {
	match status {
		BatchStatus::Processing => "processing",
		BatchStatus::Completed => "completed",
		BatchStatus::Failed => "failed",
	}
}

pub fn batch_status_from_str(s: &str) -> Result<BatchStatus, ServiceError> {
	match s {
		"processing" => Ok(BatchStatus::Processing),
		"completed" => Ok(BatchStatus::Completed),
		"failed" => Ok(BatchStatus::Failed),
		other => Err(ServiceError::Internal(format!("unknown batch status in store: {other}"))),
	}
}

pub fn delivery_status_to_str(status: DeliveryStatus) -> &'static str {
	match status {
		DeliveryStatus::Pending => "pending",
		DeliveryStatus::Success => "success",
		DeliveryStatus::Failed => "failed",
	}
}

pub fn delivery_status_from_str(s: &str) -> Result<DeliveryStatus, ServiceError> {
	match s {
		"pending" => Ok(DeliveryStatus::Pending),
		"success" => Ok(DeliveryStatus::Success),
		"failed" => Ok(DeliveryStatus::Failed),
		other => Err(ServiceError::Internal(format!("unknown delivery status in store: {other}"))),
	}
}

pub fn audio_content_type_to_str(kind: AudioContentType) -> &'static str {
	match kind {
		AudioContentType::General => "general",
		AudioContentType::PhoneCall => "phone_call",
		AudioContentType::Meeting => "meeting",
		AudioContentType::VoiceMemo => "voice_memo",
		AudioContentType::Interview => "interview",
		AudioContentType::Lecture => "lecture",
	}
}

pub fn audio_content_type_from_str(s: &str) -> Result<AudioContentType, ServiceError> {
	match s {
		"general" => Ok(AudioContentType::General),
		"phone_call" => Ok(AudioContentType::PhoneCall),
		"meeting" => Ok(AudioContentType::Meeting),
		"voice_memo" => Ok(AudioContentType::VoiceMemo),
		"interview" => Ok(AudioContentType::Interview),
		"lecture" => Ok(AudioContentType::Lecture),
		other => Err(ServiceError::Internal(format!("unknown content_type in store: {other}"))),
	}
}

pub fn summary_length_to_str(length: SummaryLength) -> &'static str {
	match length {
		SummaryLength::Short => "short",
		SummaryLength::Medium => "medium",
		SummaryLength::Detailed => "detailed",
	}
}

pub fn summary_length_from_str(s: &str) -> Result<SummaryLength, ServiceError> {
	match s {
		"short" => Ok(SummaryLength::Short),
		"medium" => Ok(SummaryLength::Medium),
		"detailed" => Ok(SummaryLength::Detailed),
		other => Err(ServiceError::Internal(format!("unknown summary length in store: {other}"))),
	}
}

pub fn summary_style_to_str(style: SummaryStyle) -> &'static str {
	match style {
		SummaryStyle::Bullet => "bullet",
		SummaryStyle::Narrative => "narrative",
		SummaryStyle::Academic => "academic",
	}
}

pub fn summary_style_from_str(s: &str) -> Result<SummaryStyle, ServiceError> {
	match s {
		"bullet" => Ok(SummaryStyle::Bullet),
		"narrative" => Ok(SummaryStyle::Narrative),
		"academic" => Ok(SummaryStyle::Academic),
		other => Err(ServiceError::Internal(format!("unknown summary style in store: {other}"))),
	}
}

pub fn json_string_list(values: &[String]) -> String {
	serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub fn parse_string_list(raw: &str) -> Vec<String> {
	serde_json::from_str(raw).unwrap_or_default()
}
