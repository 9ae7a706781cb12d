use prometheus::{Counter, Gauge, Registry};

use crate::error::PoolError;

/// Worker-pool metrics (spec.md §2 C6), generalized from the teacher's
/// `WorkerPool` counters/gauges of the same names.
#[derive(Clone)]
pub struct PoolMetrics {
	pub active_workers: Gauge,
	pub jobs_processed: Counter,
	pub jobs_failed: Counter,
	pub queue_depth: Gauge,
}

impl PoolMetrics {
	/// # Errors
	/// Returns [`PoolError::Prometheus`] if registration on `registry` fails
	/// (e.g. a name collision from registering twice on the same registry).
	pub fn register(registry: &Registry) -> Result<Self, PoolError> {
		let active_workers = Gauge::new("worker_pool_active_workers", "Workers currently executing a job")?;
		let jobs_processed = Counter::new("worker_pool_jobs_processed_total", "Jobs that reached a terminal state")?;
		let jobs_failed = Counter::new("worker_pool_jobs_failed_total", "Jobs that reached the failed state")?;
		let queue_depth = Gauge::new("worker_pool_queue_depth", "Jobs currently sitting in the queue")?;

		registry.register(Box::new(active_workers.clone()))?;
		registry.register(Box::new(jobs_processed.clone()))?;
		registry.register(Box::new(jobs_failed.clone()))?;
		registry.register(Box::new(queue_depth.clone()))?;

		Ok(Self {
			active_workers,
			jobs_processed,
			jobs_failed,
			queue_depth,
		})
	}
}
