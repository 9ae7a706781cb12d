use async_trait::async_trait;
use media_core::Job;
use tokio_util::sync::CancellationToken;

/// What a worker needs from the dispatcher (C7, spec.md §4.6). `task-queue`
/// only knows that a job exists and must go somewhere; it never decodes
/// `JobKind` payloads itself — that stays in `media-executors`, which is the
/// crate that actually implements this trait.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
	/// Process one job to completion. Must not panic under normal error
	/// conditions — failures belong in the owning record's `error_message`,
	/// not in a panic. `ct` is a child of the worker pool's shutdown scope,
	/// never the request token that originally enqueued the job
	/// (spec.md §5, §9).
	async fn handle(&self, job: Job, ct: CancellationToken);

	/// Called by the worker pool when `handle` panicked (spec.md §4.5:
	/// "a panic inside one executor never kills the worker; the worker...
	/// marks the owning record *failed* with message `internal_error`").
	/// Implementations should update storage directly; this path must itself
	/// avoid panicking (it is called from inside a panic-recovery branch).
	async fn mark_internal_error(&self, job: &Job);
}
