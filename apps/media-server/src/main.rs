mod auth;
mod config;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::{BoxError, Router};
use media_core::ports::{Extractor, PdfExtractor, Summarizer, WebhookPublisher, Whisper};
use media_executors::Dispatcher;
use media_extractor::{ExtractorConfig, YtDlpExtractor};
use media_pdf::PdfExtractTextExtractor;
use media_store::{LocalBlobStore, SqliteStore};
use media_summarizer::{SummarizerClient, SummarizerConfig};
use media_whisper::{WhisperClient, WhisperConfig};
use some_services::rate_limiter::KeyedRateLimiter;
use task_queue::{JobQueue, WorkerPool};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use webhooks::{WebhookConfig, WebhookEngine};

use crate::config::Config;
use crate::state::{build_registry, AppState};

async fn handle_tower_error(error: BoxError) -> media_core::ServiceError {
	if error.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("request timeout: {error}");
		media_core::ServiceError::Internal("request timeout".to_string())
	} else if error.is::<tower::load_shed::error::Overloaded>() {
		tracing::warn!("service overloaded: {error}");
		media_core::ServiceError::Unconfigured("overloaded".to_string())
	} else {
		tracing::error!("unhandled tower error: {error}");
		media_core::ServiceError::Internal(error.to_string())
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::new();
	init_tracing(&config);
	let config = Arc::new(config);

	let store: Arc<dyn media_core::ports::Store> = Arc::new(SqliteStore::connect(&config.database_url).await?);
	let blobs: Arc<dyn media_core::ports::BlobStore> = Arc::new(LocalBlobStore::new(config.blob_storage_dir.clone()));

	let whisper: Arc<dyn Whisper> = Arc::new(WhisperClient::new(WhisperConfig::new(config.whisper_endpoint.clone(), config.whisper_credential.clone())));

	let mut extractor_config = ExtractorConfig::new(config.extractor_binary_path.clone()).with_timeout(config.extractor_timeout);
	if let Some(proxy) = config.extractor_proxy.clone() {
		extractor_config = extractor_config.with_proxy(proxy);
	}
	let extractor: Arc<dyn Extractor> = Arc::new(YtDlpExtractor::new(extractor_config).with_whisper(Some(Arc::clone(&whisper))));

	let summarizer: Arc<dyn Summarizer> = Arc::new(SummarizerClient::new(SummarizerConfig::new(
		config.summarizer_endpoint.clone(),
		config.summarizer_credential.clone(),
		config.summarizer_default_model.clone(),
	)));

	let pdf: Arc<dyn PdfExtractor> = Arc::new(PdfExtractTextExtractor::new());

	let registry = Arc::new(build_registry());

	let webhook_config = WebhookConfig { delivery_concurrency: config.webhook_delivery_concurrency, ..WebhookConfig::new() };
	let webhook_engine = Arc::new(WebhookEngine::new(Arc::clone(&store), webhook_config, &registry)?);
	let webhook_publisher: Arc<dyn WebhookPublisher> = webhook_engine.clone() as Arc<dyn WebhookPublisher>;

	let (queue, rx) = JobQueue::new(config.job_queue_size);
	let queue = Arc::new(queue);

	let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), Arc::clone(&extractor), Arc::clone(&whisper), Arc::clone(&summarizer), Arc::clone(&blobs), Arc::clone(&webhook_publisher)));

	let pool_config = task_queue::Config {
		worker_count: config.worker_count,
		job_queue_size: config.job_queue_size,
		shutdown_timeout: config.shutdown_timeout,
	};
	let pool = Arc::new(WorkerPool::new(pool_config, Arc::clone(&queue), dispatcher, &registry)?);
	pool.start(rx).await;

	let rate_limiter = Arc::new(KeyedRateLimiter::new(config.rate_limit_max_tokens, config.rate_limit_window));

	let shutdown_token = CancellationToken::new();

	let app_state = AppState::new(
		Arc::clone(&config),
		shutdown_token.clone(),
		Arc::clone(&store),
		extractor,
		whisper,
		summarizer,
		pdf,
		blobs,
		Arc::clone(&queue),
		Arc::clone(&rate_limiter),
		Arc::clone(&webhook_engine),
		Arc::clone(&registry),
	);

	let sweeper_token = shutdown_token.clone();
	let sweeper_limiter = Arc::clone(&rate_limiter);
	let sweep_interval = config.rate_limit_sweep_interval;
	tokio::spawn(async move {
		sweeper_limiter.run_sweeper(sweeper_token, sweep_interval).await;
	});

	let protected = Router::new()
		.route("/api/v1/transcripts", post(handlers::transcripts::create_transcript).get(handlers::transcripts::list_transcripts))
		.route("/api/v1/transcripts/batch", post(handlers::batches::create_batch))
		.route("/api/v1/transcripts/:id", get(handlers::transcripts::get_transcript).delete(handlers::transcripts::delete_transcript))
		.route("/api/v1/transcripts/:id/summaries", get(handlers::summaries::list_summaries_for_transcript))
		.route("/api/v1/batches/:id", get(handlers::batches::get_batch))
		.route(
			"/api/v1/audio/transcribe",
			post(handlers::audio::transcribe_audio).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
		)
		.route("/api/v1/audio/transcriptions", get(handlers::audio::list_audio_transcriptions))
		.route("/api/v1/audio/transcriptions/search", get(handlers::audio::search_audio_transcriptions))
		.route("/api/v1/audio/transcriptions/:id", get(handlers::audio::get_audio_transcription))
		.route("/api/v1/audio/transcriptions/:id/summarize", post(handlers::audio::summarize_audio))
		.route(
			"/api/v1/pdf/extract",
			post(handlers::pdf::extract_pdf).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
		)
		.route("/api/v1/pdf/extractions", get(handlers::pdf::list_pdf_extractions))
		.route("/api/v1/pdf/extractions/:id", get(handlers::pdf::get_pdf_extraction).delete(handlers::pdf::delete_pdf_extraction))
		.route("/api/v1/summaries", post(handlers::summaries::create_summary))
		.route("/api/v1/webhooks", post(handlers::webhooks::create_webhook).get(handlers::webhooks::list_webhooks))
		.route("/api/v1/webhooks/deliveries", get(handlers::webhooks::list_webhook_deliveries))
		.route(
			"/api/v1/webhooks/:id",
			patch(handlers::webhooks::update_webhook).delete(handlers::webhooks::delete_webhook),
		)
		.layer(from_fn_with_state(Arc::clone(&rate_limiter), middleware::rate_limit_middleware));

	let public = Router::new().route("/healthz", get(handlers::health::health)).route("/metrics", get(handlers::health::metrics));

	let app = Router::new().merge(protected).merge(public).with_state(app_state);

	let app = app.layer(
		ServiceBuilder::new()
			.layer(HandleErrorLayer::new(|error: BoxError| async move { handle_tower_error(error).await }))
			.layer(TraceLayer::new_for_http())
			.layer(ConcurrencyLimitLayer::new(config.worker_count * 4))
			.layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
			.layer(LoadShedLayer::new()),
	);

	let addr = format!("{}:{}", config.host, config.port);
	let listener = TcpListener::bind(&addr).await?;
	tracing::info!(%addr, "media-server listening");

	let signal_token = shutdown_token.clone();
	tokio::spawn(async move {
		tokio::signal::ctrl_c().await.ok();
		tracing::info!("received ctrl-c, starting graceful shutdown");
		signal_token.cancel();
	});

	let server_token = shutdown_token.clone();
	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;

	tracing::info!("http server stopped, draining workers");
	match tokio::time::timeout(config.shutdown_timeout, pool.stop()).await {
		Ok(()) => tracing::info!("worker pool drained"),
		Err(_) => tracing::warn!("worker pool stop exceeded shutdown_timeout"),
	}
	webhook_engine.shutdown();

	tracing::info!("shutdown complete");
	Ok(())
}

fn init_tracing(config: &Config) {
	let filter = config.rust_log.as_deref().map_or_else(EnvFilter::from_default_env, |raw| EnvFilter::from_str(raw).unwrap_or_else(|_| EnvFilter::from_default_env()));

	let registry = tracing_subscriber::registry();
	if config.log_json {
		registry
			.with(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			)
			.init();
	} else {
		registry.with(tracing_subscriber::fmt::layer().with_filter(filter)).init();
	}
}
