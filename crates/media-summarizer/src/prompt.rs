use media_core::ports::SummarizeOptions;
use media_core::model::{AudioContentType, SummaryLength, SummaryStyle};

/// Builds the single user-message prompt sent to the chat-completion API
/// (spec.md §4.4: "deterministically constructed from `content_type`,
/// `length`, and `style` using a fixed template table"). The instruction to
/// respond as JSON comes first so models that honor a JSON-mode system
/// prompt and models that only follow the user turn both get the same cue.
#[must_use]
pub fn build_prompt(text: &str, options: &SummarizeOptions) -> String {
	let length_instruction = match options.length {
		SummaryLength::Short => "Write a concise summary in 2-3 sentences.",
		SummaryLength::Medium => "Write a summary in one or two short paragraphs.",
		SummaryLength::Detailed => "Write a thorough, detailed summary covering all major points.",
	};

	let style_instruction = match options.style {
		SummaryStyle::Bullet => "Format the summary as a bulleted list of key statements.",
		SummaryStyle::Narrative => "Write the summary as flowing prose, not a list.",
		SummaryStyle::Academic => "Write the summary in a formal, academic register.",
	};

	let content_instruction = match options.content_type {
		Some(AudioContentType::PhoneCall) => "This is a transcript of a phone call. Also extract action items (who owes what) and decisions made.",
		Some(AudioContentType::Meeting) => "This is a transcript of a meeting. Also extract action items and decisions made, attributed to speakers where possible.",
		Some(AudioContentType::VoiceMemo) => "This is a personal voice memo.",
		Some(AudioContentType::Interview) => "This is an interview transcript.",
		Some(AudioContentType::Lecture) => "This is a lecture transcript; focus the summary on the taught concepts.",
		Some(AudioContentType::General) | None => "",
	};

	let wants_structured_extras = matches!(options.content_type, Some(AudioContentType::PhoneCall) | Some(AudioContentType::Meeting));

	let json_shape = if wants_structured_extras {
		r#"{"summary": "...", "key_points": ["..."], "action_items": ["..."], "decisions": ["..."]}"#
	} else {
		r#"{"summary": "...", "key_points": ["..."]}"#
	};

	format!(
		"Summarize the following transcript.\n{length_instruction} {style_instruction} {content_instruction}\n\
		Respond with a JSON object shaped like {json_shape}. If you cannot produce JSON, respond with a \
		prose summary followed by a Markdown bullet list of key points.\n\n\
		Transcript:\n{text}"
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options(content_type: Option<AudioContentType>) -> SummarizeOptions {
		SummarizeOptions {
			length: SummaryLength::Medium,
			style: SummaryStyle::Bullet,
			content_type,
			model_override: None,
		}
	}

	#[test]
	fn meeting_prompt_requests_action_items() {
		let prompt = build_prompt("hello", &options(Some(AudioContentType::Meeting)));
		assert!(prompt.contains("action_items"));
		assert!(prompt.contains("decisions"));
	}

	#[test]
	fn general_prompt_omits_action_items() {
		let prompt = build_prompt("hello", &options(Some(AudioContentType::General)));
		assert!(!prompt.contains("action_items"));
	}

	#[test]
	fn prompt_embeds_the_transcript_verbatim() {
		let prompt = build_prompt("the quick brown fox", &options(None));
		assert!(prompt.ends_with("the quick brown fox"));
	}
}
