use std::sync::Arc;

use media_core::{BackgroundScope, Job};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::dispatch::JobHandler;
use crate::metrics::PoolMetrics;
use crate::queue::JobQueue;

/// One worker's dequeue loop (C6, spec.md §4.5). Workers are stateless and
/// compete for the next job via the shared `rx` mutex; no two workers can
/// hold the same job at once because a job is dequeued exactly once.
///
/// `stop_dequeue` fires as soon as [`crate::pool::WorkerPool::stop`] is
/// called: the worker stops pulling *new* jobs immediately but still runs
/// whatever job it has already dequeued to completion (or forced
/// cancellation once the shutdown budget elapses, via `background`).
pub(crate) async fn run<H: JobHandler>(id: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>, queue: Arc<JobQueue>, handler: Arc<H>, background: BackgroundScope, stop_dequeue: CancellationToken, metrics: PoolMetrics) {
	loop {
		let job = tokio::select! {
			biased;
			() = stop_dequeue.cancelled() => break,
			next = async {
				let mut guard = rx.lock().await;
				guard.recv().await
			} => match next {
				Some(job) => job,
				None => break,
			},
		};

		queue.record_dequeue();
		metrics.queue_depth.set(queue.depth() as f64);
		metrics.active_workers.inc();

		let job_token = background.job_token();
		let job_id = job.id;
		let kind = job.kind.label();
		let job_for_panic = job.clone();

		// A panic inside `handle` must never take the worker down
		// (spec.md §4.5). `tokio::spawn` gives the runtime's own panic
		// catch: a panicking task surfaces here as a `JoinError`, not an
		// unwinding stack through this loop.
		let handler_for_task = Arc::clone(&handler);
		let outcome = tokio::spawn(async move { handler_for_task.handle(job, job_token).await }).await;

		metrics.active_workers.dec();
		metrics.jobs_processed.inc();

		if let Err(join_err) = outcome {
			tracing::error!(worker = id, job_id = %job_id, kind, error = %join_err, "executor panicked; marking job failed");
			metrics.jobs_failed.inc();
			handler.mark_internal_error(&job_for_panic).await;
		}
	}
	tracing::info!(worker = id, "worker exiting");
}

#[cfg(test)]
mod tests {
	use async_trait::async_trait;
	use media_core::JobKind;
	use prometheus::Registry;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;
	use uuid::Uuid;

	use super::*;
	use crate::metrics::PoolMetrics;
	use crate::queue::JobQueue;

	struct CountingHandler {
		handled: Arc<AtomicUsize>,
		panics: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl JobHandler for CountingHandler {
		async fn handle(&self, job: Job, _ct: CancellationToken) {
			if matches!(job.kind, JobKind::AudioTranscription { .. }) {
				panic!("synthetic panic for test coverage");
			}
			self.handled.fetch_add(1, Ordering::SeqCst);
		}

		async fn mark_internal_error(&self, _job: &Job) {
			self.panics.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[tokio::test]
	async fn worker_continues_after_executor_panic() {
		let (queue, rx) = JobQueue::new(8);
		let queue = Arc::new(queue);
		let rx = Arc::new(Mutex::new(rx));
		let handled = Arc::new(AtomicUsize::new(0));
		let panics = Arc::new(AtomicUsize::new(0));
		let handler = Arc::new(CountingHandler {
			handled: Arc::clone(&handled),
			panics: Arc::clone(&panics),
		});
		let background = BackgroundScope::new();
		let stop = CancellationToken::new();
		let metrics = PoolMetrics::register(&Registry::new()).unwrap();

		queue
			.try_submit(Job::new(
				Uuid::new_v4(),
				JobKind::AudioTranscription {
					audio_id: Uuid::new_v4(),
					with_summary: false,
					content_type: media_core::model::AudioContentType::General,
				},
			))
			.unwrap();
		queue.try_submit(Job::new(Uuid::new_v4(), JobKind::TranscriptExtraction { transcript_id: Uuid::new_v4() })).unwrap();

		let worker = tokio::spawn(run(0, Arc::clone(&rx), Arc::clone(&queue), Arc::clone(&handler), background, stop.clone(), metrics));

		tokio::time::sleep(Duration::from_millis(100)).await;
		stop.cancel();
		let _ = tokio::time::timeout(Duration::from_secs(1), worker).await;

		assert_eq!(handled.load(Ordering::SeqCst), 1);
		assert_eq!(panics.load(Ordering::SeqCst), 1);
	}
}
