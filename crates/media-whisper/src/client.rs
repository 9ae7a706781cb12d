use async_trait::async_trait;
use media_core::ports::{Whisper, WhisperError, WhisperResult};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::WhisperConfig;

/// Raw shape of the remote endpoint's response (spec.md §4.3, §6:
/// `JSON {text, language, duration}`). `duration` arrives as a float number
/// of seconds.
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
	text: String,
	#[serde(default)]
	language: Option<String>,
	#[serde(default)]
	duration: Option<f64>,
}

/// Whisper Port (C3, spec.md §4.3): multipart-uploads an audio byte stream
/// to a remote Whisper-compatible endpoint.
pub struct WhisperClient {
	http: reqwest::Client,
	config: WhisperConfig,
}

impl WhisperClient {
	#[must_use]
	pub fn new(config: WhisperConfig) -> Self {
		Self { http: reqwest::Client::new(), config }
	}
}

#[async_trait]
impl Whisper for WhisperClient {
	fn is_configured(&self) -> bool {
		self.config.credential.is_some()
	}

	async fn transcribe(&self, ct: &CancellationToken, audio: Vec<u8>, filename: &str) -> Result<WhisperResult, WhisperError> {
		let Some(credential) = self.config.credential.clone() else {
			return Err(WhisperError::Unconfigured);
		};

		let part = reqwest::multipart::Part::bytes(audio).file_name(filename.to_string());
		let form = reqwest::multipart::Form::new().part("file", part).text("filename", filename.to_string());

		let request = self.http.post(&self.config.endpoint).bearer_auth(credential).timeout(self.config.timeout).multipart(form).send();

		let response = tokio::select! {
			biased;
			() = ct.cancelled() => return Err(WhisperError::Cancelled),
			res = request => res.map_err(|e| WhisperError::UploadFailed(e.to_string()))?,
		};

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = status.as_u16(), "whisper endpoint returned an error response");
			return Err(WhisperError::RemoteError(status.as_u16(), body));
		}

		let body: TranscribeResponse = response.json().await.map_err(|e| {
			tracing::warn!(error = %e, "failed to parse whisper response body");
			WhisperError::ParseFailed
		})?;

		tracing::debug!(filename, text_len = body.text.len(), "whisper transcription succeeded");

		Ok(WhisperResult {
			text: body.text,
			language: body.language.unwrap_or_else(|| "unknown".to_string()),
			duration_seconds: body.duration.map_or(0, |secs| secs.round() as i64),
		})
	}
}
