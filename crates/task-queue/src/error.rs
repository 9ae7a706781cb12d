use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
	#[error("queue is full")]
	Full,
	#[error("queue is shut down")]
	ShutDown,
	#[error("submit was cancelled")]
	Cancelled,
}

#[derive(Error, Debug)]
pub enum PoolError {
	#[error("Prometheus error: {0}")]
	Prometheus(#[from] prometheus::Error),
}
