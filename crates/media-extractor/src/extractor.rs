use std::sync::Arc;

use async_trait::async_trait;
use media_core::ports::{ExtractError, ExtractedTranscript, Extractor, Whisper};
use tokio_util::sync::CancellationToken;

use crate::config::ExtractorConfig;
use crate::cue::parse_cues;
use crate::subprocess::{audio_download_args, metadata_args, run_capturing_stdout, subtitle_args};

/// Extractor Port (C2, spec.md §4.2) implementation driving an external
/// subprocess (grounded on the teacher's `ffprobe`-via-`Command` pattern in
/// `file_host`'s audio validator, generalized to `tokio::process` so the
/// whole call is cancellable rather than blocking a thread).
pub struct YtDlpExtractor {
	config: ExtractorConfig,
	whisper: Option<Arc<dyn Whisper>>,
}

impl YtDlpExtractor {
	#[must_use]
	pub const fn new(config: ExtractorConfig) -> Self {
		Self { config, whisper: None }
	}

	/// Wires the no-captions fallback (spec.md §4.2 step 3). Passing `None`
	/// disables the fallback entirely, matching spec.md §6's
	/// `whisper_credential absent -> YouTube fallback disabled`.
	#[must_use]
	pub fn with_whisper(mut self, whisper: Option<Arc<dyn Whisper>>) -> Self {
		self.whisper = whisper;
		self
	}

	async fn fetch_metadata(&self, ct: &CancellationToken, url: &str) -> Result<(Option<String>, Option<String>, Option<i64>), ExtractError> {
		let args = metadata_args(&self.config, url);
		let raw = run_capturing_stdout(ct, &self.config, &args).await?;
		let line = String::from_utf8_lossy(&raw);
		let first_line = line.lines().next().unwrap_or_default();
		let mut parts = first_line.split('\t');
		let title = parts.next().map(str::trim).filter(|s| !s.is_empty() && *s != "NA").map(str::to_string);
		let channel = parts.next().map(str::trim).filter(|s| !s.is_empty() && *s != "NA").map(str::to_string);
		let duration = parts.next().and_then(|s| s.trim().parse::<f64>().ok()).map(|secs| secs.round() as i64);
		Ok((title, channel, duration))
	}

	async fn fetch_subtitles(&self, ct: &CancellationToken, url: &str) -> Result<String, ExtractError> {
		let args = subtitle_args(&self.config, url);
		let raw = run_capturing_stdout(ct, &self.config, &args).await?;
		Ok(parse_cues(&String::from_utf8_lossy(&raw)))
	}

	async fn fallback_via_whisper(&self, ct: &CancellationToken, url: &str, whisper: &Arc<dyn Whisper>) -> Result<(String, String), ExtractError> {
		let out_path = std::env::temp_dir().join(format!("media-extractor-{}.audio", uuid::Uuid::new_v4()));
		let out_path_str = out_path.to_string_lossy().to_string();

		let args = audio_download_args(&self.config, url, &out_path_str);
		run_capturing_stdout(ct, &self.config, &args).await?;

		let audio_bytes = tokio::fs::read(&out_path).await.map_err(|e| ExtractError::SubprocessFailed(format!("reading downloaded audio: {e}")))?;
		let _ = tokio::fs::remove_file(&out_path).await;

		let filename = out_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "audio".to_string());

		let result = whisper.transcribe(ct, audio_bytes, &filename).await.map_err(|e| ExtractError::SubprocessFailed(format!("whisper fallback failed: {e}")))?;

		Ok((result.text, result.language))
	}
}

#[async_trait]
impl Extractor for YtDlpExtractor {
	async fn extract(&self, ct: &CancellationToken, youtube_url: &str) -> Result<ExtractedTranscript, ExtractError> {
		if media_core::parse_video_id(youtube_url).is_none() {
			return Err(ExtractError::InvalidUrl);
		}

		let (title, channel_name, duration_seconds) = self.fetch_metadata(ct, youtube_url).await?;
		let captions = self.fetch_subtitles(ct, youtube_url).await?;

		if !captions.trim().is_empty() {
			tracing::debug!(youtube_url, "subtitle extraction succeeded");
			return Ok(ExtractedTranscript {
				title,
				channel_name,
				duration_seconds,
				language: "unknown".to_string(),
				text: captions,
			});
		}

		let Some(whisper) = self.whisper.as_ref().filter(|w| w.is_configured()) else {
			tracing::debug!(youtube_url, "no captions and whisper unconfigured, giving up");
			return Err(ExtractError::NoCaptions);
		};

		tracing::info!(youtube_url, "no captions found, falling back to whisper");
		let (text, language) = self.fallback_via_whisper(ct, youtube_url, whisper).await?;
		if text.trim().is_empty() {
			return Err(ExtractError::NoCaptions);
		}

		Ok(ExtractedTranscript {
			title,
			channel_name,
			duration_seconds,
			language: if language.is_empty() { "unknown".to_string() } else { language },
			text,
		})
	}
}
