use std::time::Duration;

use clap::Parser;

/// Top-level process configuration (spec.md §6's configuration table),
/// following `file_host::config::Config`'s single flat `clap::Parser` rather
/// than splitting per-port config structs out to the CLI surface — those
/// (`ExtractorConfig`, `WhisperConfig`, `SummarizerConfig`, `WebhookConfig`,
/// `task_queue::Config`) are built from these fields in `main.rs`.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	#[arg(long, env = "LOG_JSON", default_value = "false", help = "Emit JSON-formatted logs")]
	pub log_json: bool,

	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	#[arg(long, env = "PORT", default_value = "8080")]
	pub port: u16,

	#[arg(long, env = "DATABASE_URL", default_value = "sqlite://media.db")]
	pub database_url: String,

	#[arg(long, env = "BLOB_STORAGE_DIR", default_value = "./blobs")]
	pub blob_storage_dir: String,

	#[arg(long, env = "WORKER_COUNT", default_value = "3", help = "Number of workers draining the job queue")]
	pub worker_count: usize,

	#[arg(long, env = "JOB_QUEUE_SIZE", default_value = "100", help = "Bounded job queue capacity")]
	pub job_queue_size: usize,

	#[arg(
        long,
        env = "SHUTDOWN_TIMEOUT_SECS",
        default_value = "30",
        value_parser = parse_duration,
        help = "Graceful shutdown budget in seconds"
    )]
	pub shutdown_timeout: Duration,

	#[arg(long, env = "EXTRACTOR_BINARY_PATH", help = "Path to the yt-dlp-compatible transcript extractor binary")]
	pub extractor_binary_path: String,

	#[arg(long, env = "EXTRACTOR_PROXY")]
	pub extractor_proxy: Option<String>,

	#[arg(
        long,
        env = "EXTRACTOR_TIMEOUT_SECS",
        default_value = "180",
        value_parser = parse_duration,
    )]
	pub extractor_timeout: Duration,

	#[arg(long, env = "WHISPER_ENDPOINT", default_value = "https://api.openai.com/v1/audio/transcriptions")]
	pub whisper_endpoint: String,

	#[arg(long, env = "WHISPER_CREDENTIAL", help = "Absent disables Whisper and the YouTube no-captions fallback")]
	pub whisper_credential: Option<String>,

	#[arg(long, env = "SUMMARIZER_ENDPOINT", default_value = "https://api.openai.com/v1/chat/completions")]
	pub summarizer_endpoint: String,

	#[arg(long, env = "SUMMARIZER_CREDENTIAL", help = "Absent disables summary endpoints (503)")]
	pub summarizer_credential: Option<String>,

	#[arg(long, env = "SUMMARIZER_DEFAULT_MODEL", default_value = "gpt-4o-mini")]
	pub summarizer_default_model: String,

	#[arg(long, env = "AUDIO_MAX_UPLOAD_BYTES", default_value = "26214400", help = "25MB audio/PDF upload ceiling")]
	pub max_upload_bytes: usize,

	#[arg(long, env = "RATE_LIMIT_MAX_TOKENS", default_value = "60", help = "Requests allowed per rate-limit window, per API key")]
	pub rate_limit_max_tokens: u32,

	#[arg(
        long,
        env = "RATE_LIMIT_WINDOW_SECS",
        default_value = "60",
        value_parser = parse_duration,
    )]
	pub rate_limit_window: Duration,

	#[arg(
        long,
        env = "RATE_LIMIT_SWEEP_INTERVAL_SECS",
        default_value = "300",
        value_parser = parse_duration,
    )]
	pub rate_limit_sweep_interval: Duration,

	#[arg(long, env = "WEBHOOK_DELIVERY_CONCURRENCY", default_value = "10")]
	pub webhook_delivery_concurrency: usize,

	#[arg(
        long,
        env = "OWNER_OVERRIDE_KEYS",
        value_delimiter = ',',
        help = "API keys (UUIDs) allowed to bypass TrySubmit queue-full rejection via blocking Submit"
    )]
	pub owner_override_keys: Vec<uuid::Uuid>,

	#[arg(
        long,
        env = "OWNER_SUBMIT_DEADLINE_SECS",
        default_value = "15",
        value_parser = parse_duration,
        help = "Deadline an owner-override Submit call waits out a full queue before giving up"
    )]
	pub owner_submit_deadline: Duration,
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::parse()
	}

	#[cfg(test)]
	#[must_use]
	pub fn test() -> Self {
		Self {
			log_json: false,
			rust_log: None,
			host: "127.0.0.1".to_string(),
			port: 0,
			database_url: "sqlite::memory:".to_string(),
			blob_storage_dir: "./blobs-test".to_string(),
			worker_count: 1,
			job_queue_size: 4,
			shutdown_timeout: Duration::from_secs(1),
			extractor_binary_path: "yt-dlp".to_string(),
			extractor_proxy: None,
			extractor_timeout: Duration::from_secs(5),
			whisper_endpoint: "http://localhost".to_string(),
			whisper_credential: None,
			summarizer_endpoint: "http://localhost".to_string(),
			summarizer_credential: None,
			summarizer_default_model: "test-model".to_string(),
			max_upload_bytes: 1024,
			rate_limit_max_tokens: 60,
			rate_limit_window: Duration::from_secs(60),
			rate_limit_sweep_interval: Duration::from_secs(300),
			webhook_delivery_concurrency: 2,
			owner_override_keys: Vec::new(),
			owner_submit_deadline: Duration::from_secs(1),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_json: false,
			rust_log: None,
			host: "0.0.0.0".to_string(),
			port: 8080,
			database_url: "sqlite://media.db".to_string(),
			blob_storage_dir: "./blobs".to_string(),
			worker_count: 3,
			job_queue_size: 100,
			shutdown_timeout: Duration::from_secs(30),
			extractor_binary_path: String::new(),
			extractor_proxy: None,
			extractor_timeout: Duration::from_secs(180),
			whisper_endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
			whisper_credential: None,
			summarizer_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
			summarizer_credential: None,
			summarizer_default_model: "gpt-4o-mini".to_string(),
			max_upload_bytes: 26_214_400,
			rate_limit_max_tokens: 60,
			rate_limit_window: Duration::from_secs(60),
			rate_limit_sweep_interval: Duration::from_secs(300),
			webhook_delivery_concurrency: 10,
			owner_override_keys: Vec::new(),
			owner_submit_deadline: Duration::from_secs(15),
		}
	}
}

fn parse_duration(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}
