use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::token_bucket::{RateLimitError, TokenBucketRateLimiter};

/// One token bucket per API key, per spec §5 ("rate-limit buckets ... live
/// in a map protected by a reader-writer lock; readers dominate; a periodic
/// sweeper removes buckets untouched for >1 hour"). Built on the same
/// [`TokenBucketRateLimiter`] the teacher uses for its single global bucket;
/// this just fans it out over a map and adds the idle-sweep lifecycle.
pub struct KeyedRateLimiter {
	buckets: RwLock<HashMap<Uuid, Entry>>,
	max_tokens: u32,
	refill_period_ms: u64,
	idle_ttl: Duration,
}

struct Entry {
	limiter: TokenBucketRateLimiter,
	last_touched_ms: AtomicU64,
}

impl Entry {
	fn new(max_tokens: u32, refill_period_ms: u64, now_ms: u64) -> Self {
		Self {
			limiter: TokenBucketRateLimiter::new_with_refill_period(max_tokens, refill_period_ms),
			last_touched_ms: AtomicU64::new(now_ms),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
	Allowed,
	Limited,
}

fn now_millis() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis().try_into().unwrap_or(u64::MAX)
}

impl KeyedRateLimiter {
	/// `max_tokens` requests allowed per `refill_period`; buckets untouched
	/// for more than one hour are reclaimed by [`KeyedRateLimiter::sweep`].
	#[must_use]
	pub fn new(max_tokens: u32, refill_period: Duration) -> Self {
		Self {
			buckets: RwLock::new(HashMap::new()),
			max_tokens,
			refill_period_ms: u64::try_from(refill_period.as_millis()).unwrap_or(u64::MAX),
			idle_ttl: Duration::from_secs(3600),
		}
	}

	/// Consume one token for `key`, lazily creating its bucket on first use
	/// (spec §9: "lazy create on first request").
	///
	/// # Errors
	/// Propagates [`RateLimitError::ClockError`] from the underlying bucket.
	pub async fn allow(&self, key: Uuid) -> Result<RateLimitOutcome, RateLimitError> {
		let now = now_millis();

		// Readers dominate: the common case (bucket already exists) only
		// ever takes a read lock.
		{
			let guard = self.buckets.read().await;
			if let Some(entry) = guard.get(&key) {
				entry.last_touched_ms.store(now, Ordering::Release);
				return Self::consume(entry);
			}
		}

		let mut guard = self.buckets.write().await;
		let entry = guard.entry(key).or_insert_with(|| Entry::new(self.max_tokens, self.refill_period_ms, now));
		entry.last_touched_ms.store(now, Ordering::Release);
		Self::consume(entry)
	}

	fn consume(entry: &Entry) -> Result<RateLimitOutcome, RateLimitError> {
		Ok(if entry.limiter.allow_request()? {
			RateLimitOutcome::Allowed
		} else {
			RateLimitOutcome::Limited
		})
	}

	/// Tokens left in `key`'s bucket, for `X-RateLimit-Remaining` (spec §7).
	/// Returns the full `max_tokens` for a key that has never been seen.
	pub async fn remaining(&self, key: Uuid) -> u32 {
		let guard = self.buckets.read().await;
		guard.get(&key).map_or(self.max_tokens, |entry| entry.limiter.get_current_tokens())
	}

	#[must_use]
	pub const fn limit(&self) -> u32 {
		self.max_tokens
	}

	/// Drop buckets untouched for over an hour (spec §5). Cheap to run
	/// often: a no-op write-lock pass when nothing has gone idle.
	pub async fn sweep(&self) {
		let now = now_millis();
		let ttl_ms = u64::try_from(self.idle_ttl.as_millis()).unwrap_or(u64::MAX);
		let mut guard = self.buckets.write().await;
		let before = guard.len();
		guard.retain(|_, entry| now.saturating_sub(entry.last_touched_ms.load(Ordering::Acquire)) < ttl_ms);
		let removed = before - guard.len();
		if removed > 0 {
			tracing::debug!(removed, remaining = guard.len(), "swept idle rate-limit buckets");
		}
	}

	/// Background sweep loop; cancel `ct` to stop (process shutdown).
	pub async fn run_sweeper(&self, ct: CancellationToken, interval: Duration) {
		loop {
			tokio::select! {
				biased;
				() = ct.cancelled() => break,
				() = tokio::time::sleep(interval) => self.sweep().await,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn separate_keys_have_independent_buckets() {
		let limiter = KeyedRateLimiter::new(1, Duration::from_secs(60));
		let a = Uuid::new_v4();
		let b = Uuid::new_v4();

		assert_eq!(limiter.allow(a).await.unwrap(), RateLimitOutcome::Allowed);
		assert_eq!(limiter.allow(a).await.unwrap(), RateLimitOutcome::Limited);
		assert_eq!(limiter.allow(b).await.unwrap(), RateLimitOutcome::Allowed);
	}

	#[tokio::test]
	async fn sweep_removes_only_idle_buckets() {
		let limiter = KeyedRateLimiter::new(5, Duration::from_secs(60));
		let key = Uuid::new_v4();
		limiter.allow(key).await.unwrap();

		{
			let mut guard = limiter.buckets.write().await;
			let entry = guard.get_mut(&key).unwrap();
			entry.last_touched_ms.store(0, Ordering::Release);
		}

		limiter.sweep().await;
		assert_eq!(limiter.buckets.read().await.len(), 0);
	}

	#[tokio::test]
	async fn remaining_reports_full_bucket_for_unseen_key() {
		let limiter = KeyedRateLimiter::new(7, Duration::from_secs(60));
		assert_eq!(limiter.remaining(Uuid::new_v4()).await, 7);
	}
}
