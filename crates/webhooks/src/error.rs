use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
	#[error("Prometheus error: {0}")]
	Prometheus(#[from] prometheus::Error),
}
