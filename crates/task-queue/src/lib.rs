pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod worker;

pub use config::Config;
pub use dispatch::JobHandler;
pub use error::{PoolError, QueueError};
pub use pool::WorkerPool;
pub use queue::JobQueue;
