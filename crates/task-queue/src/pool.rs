use std::sync::Arc;

use media_core::{BackgroundScope, Job};
use prometheus::Registry;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::JobHandler;
use crate::error::PoolError;
use crate::metrics::PoolMetrics;
use crate::queue::JobQueue;

/// Fixed-size consumer pool draining [`JobQueue`] (C6, spec.md §4.5). Owns
/// the shared shutdown signal every worker observes and the background
/// cancellation scope every executor call runs under.
pub struct WorkerPool<H: JobHandler> {
	queue: Arc<JobQueue>,
	handler: Arc<H>,
	config: Config,
	background: BackgroundScope,
	stop_dequeue: CancellationToken,
	metrics: PoolMetrics,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<H: JobHandler> WorkerPool<H> {
	/// # Errors
	/// Returns [`PoolError::Prometheus`] if metric registration on
	/// `registry` fails.
	pub fn new(config: Config, queue: Arc<JobQueue>, handler: Arc<H>, registry: &Registry) -> Result<Self, PoolError> {
		let metrics = PoolMetrics::register(registry)?;
		Ok(Self {
			queue,
			handler,
			config,
			background: BackgroundScope::new(),
			stop_dequeue: CancellationToken::new(),
			metrics,
			handles: Mutex::new(Vec::new()),
		})
	}

	/// Spawn `worker_count` workers draining `rx`, the receiving half
	/// returned alongside the [`JobQueue`] this pool was built with. `rx`
	/// moves into a shared mutex so workers compete for the next job
	/// (spec.md §4.5: "workers compete").
	pub async fn start(&self, rx: mpsc::Receiver<Job>) {
		let rx = Arc::new(Mutex::new(rx));
		let mut handles = self.handles.lock().await;
		for id in 0..self.config.worker_count {
			let rx = Arc::clone(&rx);
			let queue = Arc::clone(&self.queue);
			let handler = Arc::clone(&self.handler);
			let background = self.background.clone();
			let stop_dequeue = self.stop_dequeue.clone();
			let metrics = self.metrics.clone();
			handles.push(tokio::spawn(crate::worker::run(id, rx, queue, handler, background, stop_dequeue, metrics)));
		}
		tracing::info!(worker_count = self.config.worker_count, "worker pool started");
	}

	#[must_use]
	pub fn queue(&self) -> &Arc<JobQueue> {
		&self.queue
	}

	/// Stop accepting new enqueues, let every worker finish whatever job it
	/// currently holds within `shutdown_timeout`, then cancel anything still
	/// running past that budget (spec.md §4.5, scenario S5).
	pub async fn stop(&self) {
		self.queue.close();
		self.stop_dequeue.cancel();

		let handles: Vec<JoinHandle<()>> = {
			let mut guard = self.handles.lock().await;
			guard.drain(..).collect()
		};

		let mut join_all = Box::pin(futures::future::join_all(handles));

		tokio::select! {
			_ = &mut join_all => {
				tracing::info!("worker pool drained within shutdown budget");
			}
			() = tokio::time::sleep(self.config.shutdown_timeout) => {
				tracing::warn!(timeout = ?self.config.shutdown_timeout, "shutdown budget exceeded; cancelling in-flight jobs");
				self.background.shutdown();
				join_all.await;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use async_trait::async_trait;
	use media_core::JobKind;
	use uuid::Uuid;

	use super::*;

	struct SlowHandler {
		started: Arc<AtomicUsize>,
		finished: Arc<AtomicUsize>,
		cancelled_early: Arc<AtomicUsize>,
		work: Duration,
	}

	#[async_trait]
	impl JobHandler for SlowHandler {
		async fn handle(&self, _job: Job, ct: CancellationToken) {
			self.started.fetch_add(1, Ordering::SeqCst);
			tokio::select! {
				() = tokio::time::sleep(self.work) => {
					self.finished.fetch_add(1, Ordering::SeqCst);
				}
				() = ct.cancelled() => {
					self.cancelled_early.fetch_add(1, Ordering::SeqCst);
				}
			}
		}

		async fn mark_internal_error(&self, _job: &Job) {}
	}

	fn sample_job() -> Job {
		Job::new(Uuid::new_v4(), JobKind::TranscriptExtraction { transcript_id: Uuid::new_v4() })
	}

	#[tokio::test]
	async fn stop_drains_in_flight_jobs_within_budget() {
		let mut config = Config::test();
		config.worker_count = 2;
		config.shutdown_timeout = Duration::from_millis(500);

		let (queue, rx) = JobQueue::new(8);
		let queue = Arc::new(queue);
		let started = Arc::new(AtomicUsize::new(0));
		let finished = Arc::new(AtomicUsize::new(0));
		let cancelled_early = Arc::new(AtomicUsize::new(0));
		let handler = Arc::new(SlowHandler {
			started: Arc::clone(&started),
			finished: Arc::clone(&finished),
			cancelled_early: Arc::clone(&cancelled_early),
			work: Duration::from_millis(50),
		});

		let pool = WorkerPool::new(config, Arc::clone(&queue), handler, &Registry::new()).unwrap();
		pool.start(rx).await;

		queue.try_submit(sample_job()).unwrap();
		queue.try_submit(sample_job()).unwrap();
		tokio::time::sleep(Duration::from_millis(10)).await;

		pool.stop().await;

		assert_eq!(started.load(Ordering::SeqCst), 2);
		assert_eq!(finished.load(Ordering::SeqCst), 2);
		assert_eq!(cancelled_early.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn try_submit_rejects_immediately_after_stop_begins() {
		let mut config = Config::test();
		config.worker_count = 1;
		config.shutdown_timeout = Duration::from_millis(500);

		let (queue, rx) = JobQueue::new(8);
		let queue = Arc::new(queue);
		let handler = Arc::new(SlowHandler {
			started: Arc::new(AtomicUsize::new(0)),
			finished: Arc::new(AtomicUsize::new(0)),
			cancelled_early: Arc::new(AtomicUsize::new(0)),
			work: Duration::from_millis(20),
		});

		let pool = WorkerPool::new(config, Arc::clone(&queue), handler, &Registry::new()).unwrap();
		pool.start(rx).await;

		pool.stop().await;
		assert!(queue.try_submit(sample_job()).is_err());
	}

	#[tokio::test]
	async fn stop_force_cancels_jobs_exceeding_budget() {
		let mut config = Config::test();
		config.worker_count = 1;
		config.shutdown_timeout = Duration::from_millis(30);

		let (queue, rx) = JobQueue::new(8);
		let queue = Arc::new(queue);
		let cancelled_early = Arc::new(AtomicUsize::new(0));
		let handler = Arc::new(SlowHandler {
			started: Arc::new(AtomicUsize::new(0)),
			finished: Arc::new(AtomicUsize::new(0)),
			cancelled_early: Arc::clone(&cancelled_early),
			work: Duration::from_secs(5),
		});

		let pool = WorkerPool::new(config, Arc::clone(&queue), handler, &Registry::new()).unwrap();
		pool.start(rx).await;
		queue.try_submit(sample_job()).unwrap();
		tokio::time::sleep(Duration::from_millis(5)).await;

		tokio::time::timeout(Duration::from_secs(2), pool.stop()).await.expect("stop must return once the job observes cancellation");
		assert_eq!(cancelled_early.load(Ordering::SeqCst), 1);
	}
}
