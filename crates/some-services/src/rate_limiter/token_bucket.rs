use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateLimitError {
	#[error("System time error: clock may have gone backwards")]
	ClockError(#[from] std::time::SystemTimeError),
	#[error("Rate limit exceeded")]
	RateLimited,
}

/// Single-key token bucket. [`super::keyed::KeyedRateLimiter`] holds one of
/// these per API key; this is the same algorithm the teacher used for its
/// one global bucket.
pub struct TokenBucketRateLimiter {
	max_tokens: u32,
	refill_rate_per_ms: u64, // tokens per millisecond (scaled by 1000 for precision)
	tokens: AtomicU32,
	last_refill: AtomicU64, // timestamp in milliseconds
}

impl TokenBucketRateLimiter {
	#[must_use]
	pub fn new_with_refill_period(max_tokens: u32, refill_period_ms: u64) -> Self {
		let refill_rate_per_ms = (u64::from(max_tokens) * 1000) / refill_period_ms.max(1);

		Self {
			max_tokens,
			refill_rate_per_ms: refill_rate_per_ms.max(1),
			tokens: AtomicU32::new(max_tokens), // start with full bucket
			last_refill: AtomicU64::new(Self::current_time_millis()),
		}
	}

	fn current_time_millis() -> u64 {
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis().try_into().unwrap_or(u64::MAX)
	}

	fn refill_tokens(&self, now: u64) {
		const MAX_ATTEMPTS: usize = 3;

		for _ in 0..MAX_ATTEMPTS {
			let last_refill = self.last_refill.load(Ordering::Acquire);

			let time_elapsed = now.saturating_sub(last_refill);
			if time_elapsed < 10 {
				break;
			}

			let tokens_to_add_scaled = time_elapsed * self.refill_rate_per_ms;
			let tokens_to_add = u32::try_from(tokens_to_add_scaled / 1000).unwrap_or(self.max_tokens);

			if tokens_to_add == 0 {
				break;
			}

			if self.last_refill.compare_exchange_weak(last_refill, now, Ordering::AcqRel, Ordering::Acquire).is_ok() {
				self.add_tokens(tokens_to_add);
				break;
			}
		}
	}

	fn add_tokens(&self, tokens_to_add: u32) {
		loop {
			let current_tokens = self.tokens.load(Ordering::Acquire);
			let new_tokens = (current_tokens + tokens_to_add).min(self.max_tokens);

			if new_tokens == current_tokens {
				break;
			}

			if self.tokens.compare_exchange_weak(current_tokens, new_tokens, Ordering::AcqRel, Ordering::Acquire).is_ok() {
				break;
			}
		}
	}

	/// Attempts to allow a request by consuming a token from the bucket.
	///
	/// # Errors
	///
	/// Returns `RateLimitError::ClockError` if there's a system time error (though this is
	/// handled gracefully in the current implementation).
	pub fn allow_request(&self) -> Result<bool, RateLimitError> {
		let now = Self::current_time_millis();
		self.refill_tokens(now);

		const MAX_ATTEMPTS: usize = 10;
		for _ in 0..MAX_ATTEMPTS {
			let current_tokens = self.tokens.load(Ordering::Acquire);
			if current_tokens == 0 {
				return Ok(false);
			}

			if self.tokens.compare_exchange_weak(current_tokens, current_tokens - 1, Ordering::AcqRel, Ordering::Acquire).is_ok() {
				return Ok(true);
			}
		}

		Ok(false)
	}

	pub fn get_current_tokens(&self) -> u32 {
		let now = Self::current_time_millis();
		self.refill_tokens(now);
		self.tokens.load(Ordering::Acquire)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::time::{sleep, Duration};

	#[tokio::test]
	async fn test_rate_limiter_refill() {
		let limiter = TokenBucketRateLimiter::new_with_refill_period(10, 1000);

		for _ in 0..10 {
			assert!(limiter.allow_request().unwrap());
		}

		assert!(!limiter.allow_request().unwrap());

		sleep(Duration::from_millis(500)).await;

		let available = limiter.get_current_tokens();
		assert!(available >= 4 && available <= 6);

		assert!(limiter.allow_request().unwrap());
	}

	#[tokio::test]
	async fn test_rate_limiter_recovery() {
		let limiter = TokenBucketRateLimiter::new_with_refill_period(5, 1000);

		for _ in 0..5 {
			assert!(limiter.allow_request().unwrap());
		}
		assert!(!limiter.allow_request().unwrap());

		sleep(Duration::from_millis(1100)).await;

		for _ in 0..5 {
			assert!(limiter.allow_request().unwrap(), "Should allow request after refill");
		}
	}
}
