pub mod keyed;
mod token_bucket;

pub use keyed::{KeyedRateLimiter, RateLimitOutcome};
pub use token_bucket::RateLimitError;
