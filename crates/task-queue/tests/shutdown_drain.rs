use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use media_core::{Job, JobKind};
use prometheus::Registry;
use task_queue::{Config, JobHandler, JobQueue, WorkerPool};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct EchoHandler {
	completed: Arc<AtomicUsize>,
	delay: Duration,
}

#[async_trait]
impl JobHandler for EchoHandler {
	async fn handle(&self, _job: Job, ct: CancellationToken) {
		tokio::select! {
			() = tokio::time::sleep(self.delay) => {
				self.completed.fetch_add(1, Ordering::SeqCst);
			}
			() = ct.cancelled() => {}
		}
	}

	async fn mark_internal_error(&self, _job: &Job) {}
}

fn sample_job() -> Job {
	Job::new(Uuid::new_v4(), JobKind::TranscriptExtraction { transcript_id: Uuid::new_v4() })
}

/// Scenario S5 (spec.md §8): 3 workers, 2 in-flight jobs, 5 queued. `Stop()`
/// with a 30s-equivalent budget rejects new `TrySubmit`s immediately, lets
/// the in-flight jobs finish, and abandons the rest in the channel.
#[tokio::test]
async fn queued_jobs_are_abandoned_while_in_flight_jobs_complete() {
	let mut config = Config::test();
	config.worker_count = 3;
	config.job_queue_size = 10;
	config.shutdown_timeout = Duration::from_secs(2);

	let (queue, rx) = JobQueue::new(config.job_queue_size);
	let queue = Arc::new(queue);
	let completed = Arc::new(AtomicUsize::new(0));
	let handler = Arc::new(EchoHandler {
		completed: Arc::clone(&completed),
		delay: Duration::from_millis(100),
	});

	let pool = WorkerPool::new(config, Arc::clone(&queue), handler, &Registry::new()).unwrap();
	pool.start(rx).await;

	for _ in 0..7 {
		queue.try_submit(sample_job()).unwrap();
	}
	// give the 3 workers a moment to pick up their first jobs
	tokio::time::sleep(Duration::from_millis(20)).await;

	pool.stop().await;

	assert!(queue.try_submit(sample_job()).is_err(), "TrySubmit must reject once shutdown has begun");
	assert_eq!(completed.load(Ordering::SeqCst), 3, "only the jobs already dequeued should complete");
}
