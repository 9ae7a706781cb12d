use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use media_core::Job;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

/// Bounded in-memory job queue (C5, spec.md §4.5). FIFO, single logical
/// queue, workers compete for entries. Not persisted across restarts —
/// spec.md's non-goals rule out durable queueing, so this is a plain
/// `tokio::sync::mpsc` channel rather than the teacher's Redis-backed
/// scheduler.
pub struct JobQueue {
	tx: mpsc::Sender<Job>,
	shutdown: Arc<AtomicBool>,
	depth: Arc<AtomicI64>,
}

impl JobQueue {
	#[must_use]
	pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
		let (tx, rx) = mpsc::channel(capacity);
		(
			Self {
				tx,
				shutdown: Arc::new(AtomicBool::new(false)),
				depth: Arc::new(AtomicI64::new(0)),
			},
			rx,
		)
	}

	/// Non-blocking submit used by request handlers (spec.md §4.5).
	///
	/// # Errors
	/// Returns [`QueueError::Full`] at capacity and [`QueueError::ShutDown`]
	/// once [`JobQueue::close`] has been called.
	pub fn try_submit(&self, job: Job) -> Result<(), QueueError> {
		if self.shutdown.load(Ordering::Acquire) {
			return Err(QueueError::ShutDown);
		}
		self.tx.try_send(job).map_err(|e| match e {
			mpsc::error::TrySendError::Full(_) => QueueError::Full,
			mpsc::error::TrySendError::Closed(_) => QueueError::ShutDown,
		})?;
		self.depth.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}

	/// Blocking submit, cancellable, for owner-override submissions that may
	/// wait out a full queue instead of being rejected (spec.md §4.5,
	/// GLOSSARY "Owner override").
	///
	/// # Errors
	/// Returns [`QueueError::Cancelled`] if `ct` fires first and
	/// [`QueueError::ShutDown`] if the queue closes while waiting.
	pub async fn submit(&self, ct: &CancellationToken, job: Job) -> Result<(), QueueError> {
		if self.shutdown.load(Ordering::Acquire) {
			return Err(QueueError::ShutDown);
		}
		tokio::select! {
			biased;
			() = ct.cancelled() => Err(QueueError::Cancelled),
			res = self.tx.send(job) => {
				res.map_err(|_| QueueError::ShutDown)?;
				self.depth.fetch_add(1, Ordering::AcqRel);
				Ok(())
			}
		}
	}

	/// Stop accepting new enqueues. Jobs already sitting in the channel are
	/// left for workers to drain (or abandon) per the shutdown semantics in
	/// spec.md §4.5.
	pub fn close(&self) {
		self.shutdown.store(true, Ordering::Release);
	}

	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.shutdown.load(Ordering::Acquire)
	}

	/// Called by a worker immediately after a successful dequeue, so
	/// `depth()` reflects jobs still sitting in the channel rather than
	/// jobs ever submitted.
	pub fn record_dequeue(&self) {
		self.depth.fetch_sub(1, Ordering::AcqRel);
	}

	#[must_use]
	pub fn depth(&self) -> i64 {
		self.depth.load(Ordering::Acquire).max(0)
	}
}
