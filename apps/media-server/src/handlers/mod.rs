pub mod audio;
pub mod batches;
pub mod health;
pub mod pdf;
pub mod summaries;
pub mod transcripts;
pub mod webhooks;

use media_core::{Job, ServiceError};
use task_queue::error::QueueError;
use task_queue::JobQueue;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::is_owner_override;
use crate::config::Config;

/// Submit `job` to the queue, honoring owner override (spec.md §7, GLOSSARY
/// "Owner override"): a configured key may block out a full queue up to
/// `owner_submit_deadline` instead of being rejected outright.
pub(crate) async fn submit_job(config: &Config, queue: &JobQueue, requester: Option<Uuid>, job: Job) -> Result<(), ServiceError> {
	let owner_override = requester.is_some_and(|key| is_owner_override(config, key));

	if owner_override {
		let ct = CancellationToken::new();
		match tokio::time::timeout(config.owner_submit_deadline, queue.submit(&ct, job)).await {
			Ok(Ok(())) => Ok(()),
			Ok(Err(_)) | Err(_) => Err(ServiceError::QueueFull),
		}
	} else {
		queue.try_submit(job).map_err(|error| match error {
			QueueError::Full | QueueError::ShutDown => ServiceError::QueueFull,
			QueueError::Cancelled => ServiceError::Internal("job submission cancelled".to_string()),
		})
	}
}

pub(crate) fn request_ct() -> CancellationToken {
	CancellationToken::new()
}
