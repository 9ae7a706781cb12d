use async_trait::async_trait;
use media_core::ports::{SummarizeError, SummarizeOptions, SummarizeResult, Summarizer};
use media_core::model::AudioContentType;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::SummarizerConfig;
use crate::parser::parse_response;
use crate::prompt::build_prompt;

/// Chat-style request with a single user message (spec.md §6: "chat-style
/// request with a single user message").
#[derive(Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
	role: &'a str,
	content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
	content: String,
}

/// Summarizer Port (C4, spec.md §4.4).
pub struct SummarizerClient {
	http: reqwest::Client,
	config: SummarizerConfig,
}

impl SummarizerClient {
	#[must_use]
	pub fn new(config: SummarizerConfig) -> Self {
		Self { http: reqwest::Client::new(), config }
	}
}

#[async_trait]
impl Summarizer for SummarizerClient {
	fn is_configured(&self) -> bool {
		self.config.credential.is_some()
	}

	async fn summarize(&self, ct: &CancellationToken, text: &str, options: &SummarizeOptions) -> Result<SummarizeResult, SummarizeError> {
		let Some(credential) = self.config.credential.clone() else {
			return Err(SummarizeError::Unconfigured);
		};

		let model = options.model_override.as_deref().unwrap_or(&self.config.default_model);
		let prompt = build_prompt(text, options);
		let request = ChatRequest {
			model,
			messages: [ChatMessage { role: "user", content: &prompt }],
		};

		let send = self.http.post(&self.config.endpoint).bearer_auth(credential).timeout(self.config.timeout).json(&request).send();

		let response = tokio::select! {
			biased;
			() = ct.cancelled() => return Err(SummarizeError::RemoteError(0, "cancelled".to_string())),
			res = send => res.map_err(|e| SummarizeError::RemoteError(0, e.to_string()))?,
		};

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = status.as_u16(), model, "summarizer endpoint returned an error response");
			return Err(SummarizeError::RemoteError(status.as_u16(), body));
		}

		let body: ChatResponse = response.json().await.map_err(|_| SummarizeError::ParseFailed)?;
		let content = body.choices.into_iter().next().map(|c| c.message.content).ok_or(SummarizeError::ParseFailed)?;

		let parsed = parse_response(&content);
		tracing::debug!(model, key_points = parsed.key_points.len(), "summarization succeeded");
		let wants_extras = matches!(options.content_type, Some(AudioContentType::PhoneCall) | Some(AudioContentType::Meeting));

		Ok(SummarizeResult {
			summary_text: parsed.summary_text,
			key_points: parsed.key_points,
			action_items: if wants_extras { parsed.action_items } else { Vec::new() },
			decisions: if wants_extras { parsed.decisions } else { Vec::new() },
			model_used: model.to_string(),
			prompt_used: prompt,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use media_core::model::{SummaryLength, SummaryStyle};

	fn options() -> SummarizeOptions {
		SummarizeOptions {
			length: SummaryLength::Short,
			style: SummaryStyle::Bullet,
			content_type: None,
			model_override: None,
		}
	}

	#[test]
	fn is_configured_reflects_credential_presence() {
		let client = SummarizerClient::new(SummarizerConfig::new("http://localhost", None, "gpt"));
		assert!(!client.is_configured());
	}

	#[tokio::test]
	async fn summarize_without_credential_degrades_immediately() {
		let client = SummarizerClient::new(SummarizerConfig::new("http://localhost", None, "gpt"));
		let ct = CancellationToken::new();
		let result = client.summarize(&ct, "hello", &options()).await;
		assert!(matches!(result, Err(SummarizeError::Unconfigured)));
	}
}
