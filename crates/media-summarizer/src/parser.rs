use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Parsed shape both parser stages converge on, regardless of whether the
/// remote model answered with structured JSON or prose (spec.md §4.4, §9
/// Open Question: "structured output vs Markdown fallback should be an
/// explicit, tested parser").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSummary {
	pub summary_text: String,
	pub key_points: Vec<String>,
	pub action_items: Vec<String>,
	pub decisions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredSummary {
	summary: String,
	#[serde(default)]
	key_points: Vec<String>,
	#[serde(default)]
	action_items: Vec<String>,
	#[serde(default)]
	decisions: Vec<String>,
}

fn list_marker() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"^(?:[-*]|\d+[.)])\s+(.*)$").expect("static pattern"))
}

/// Stage 1: try to parse the model's response as the structured JSON shape
/// requested in the prompt, scanning for a JSON object if the model wrapped
/// it in prose or a fenced code block. Stage 2, on any failure, falls back
/// to scanning Markdown: the first non-list paragraph becomes the summary,
/// lines starting with `-`, `*`, or a numeric enumerator become key points.
#[must_use]
pub fn parse_response(raw: &str) -> ParsedSummary {
	if let Some(structured) = try_parse_json(raw) {
		return ParsedSummary {
			summary_text: structured.summary,
			key_points: structured.key_points,
			action_items: structured.action_items,
			decisions: structured.decisions,
		};
	}
	parse_markdown_fallback(raw)
}

fn try_parse_json(raw: &str) -> Option<StructuredSummary> {
	let candidate = extract_json_object(raw)?;
	serde_json::from_str(&candidate).ok()
}

/// Finds the first balanced `{...}` span in `raw`, tolerating surrounding
/// prose or a ` ```json ` fence the model added despite instructions.
fn extract_json_object(raw: &str) -> Option<String> {
	let start = raw.find('{')?;
	let mut depth = 0i32;
	for (offset, ch) in raw[start..].char_indices() {
		match ch {
			'{' => depth += 1,
			'}' => {
				depth -= 1;
				if depth == 0 {
					return Some(raw[start..=start + offset].to_string());
				}
			}
			_ => {}
		}
	}
	None
}

fn parse_markdown_fallback(raw: &str) -> ParsedSummary {
	let mut summary_lines = Vec::new();
	let mut key_points = Vec::new();

	for line in raw.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}
		if let Some(captures) = list_marker().captures(trimmed) {
			key_points.push(captures[1].trim().to_string());
		} else {
			summary_lines.push(trimmed);
		}
	}

	ParsedSummary {
		summary_text: summary_lines.join(" "),
		key_points,
		action_items: Vec::new(),
		decisions: Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_clean_json_response() {
		let raw = r#"{"summary": "It went well.", "key_points": ["a", "b"], "action_items": [], "decisions": []}"#;
		let parsed = parse_response(raw);
		assert_eq!(parsed.summary_text, "It went well.");
		assert_eq!(parsed.key_points, vec!["a", "b"]);
	}

	#[test]
	fn parses_json_wrapped_in_prose_and_fences() {
		let raw = "Sure, here you go:\n```json\n{\"summary\": \"ok\", \"key_points\": [\"x\"]}\n```\nhope that helps";
		let parsed = parse_response(raw);
		assert_eq!(parsed.summary_text, "ok");
		assert_eq!(parsed.key_points, vec!["x"]);
	}

	#[test]
	fn falls_back_to_markdown_when_not_json() {
		let raw = "This call covered the Q3 roadmap.\n\n- Ship the new pricing page\n* Follow up with legal\n1. Confirm launch date";
		let parsed = parse_response(raw);
		assert_eq!(parsed.summary_text, "This call covered the Q3 roadmap.");
		assert_eq!(parsed.key_points, vec!["Ship the new pricing page", "Follow up with legal", "Confirm launch date"]);
	}

	#[test]
	fn malformed_json_falls_back_without_panicking() {
		let raw = "{not: valid json}\n- still a bullet";
		let parsed = parse_response(raw);
		assert!(parsed.key_points.contains(&"still a bullet".to_string()));
	}
}
