/// YouTube video ids are always 11 characters drawn from `[A-Za-z0-9_-]`.
/// Shared by `media-store` (deriving the dedup key when creating a batch),
/// `media-extractor` (validating before it shells out), and the HTTP layer
/// (rejecting malformed URLs before anything is persisted).
fn is_valid_id(candidate: &str) -> bool {
	candidate.len() == 11 && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extracts the 11-character video id from any of the common YouTube URL
/// shapes (`youtu.be/<id>`, `youtube.com/watch?v=<id>`,
/// `youtube.com/embed/<id>`, `youtube.com/shorts/<id>`), or accepts a bare
/// id passed directly. Returns `None` for anything else (spec.md §4.2:
/// `invalid_url`).
#[must_use]
pub fn parse_video_id(input: &str) -> Option<String> {
	let trimmed = input.trim();

	if is_valid_id(trimmed) {
		return Some(trimmed.to_string());
	}

	let url = url::Url::parse(trimmed).ok()?;
	let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

	let candidate = match host {
		"youtu.be" => url.path().trim_start_matches('/').to_string(),
		"youtube.com" | "music.youtube.com" => {
			if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "v") {
				id.to_string()
			} else {
				let path = url.path();
				path.strip_prefix("/embed/").or_else(|| path.strip_prefix("/shorts/")).or_else(|| path.strip_prefix("/live/"))?.to_string()
			}
		}
		_ => return None,
	};

	is_valid_id(&candidate).then_some(candidate)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_short_url() {
		assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
	}

	#[test]
	fn parses_watch_url_with_extra_params() {
		assert_eq!(parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=abc").as_deref(), Some("dQw4w9WgXcQ"));
	}

	#[test]
	fn parses_shorts_url() {
		assert_eq!(parse_video_id("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
	}

	#[test]
	fn accepts_bare_id() {
		assert_eq!(parse_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
	}

	#[test]
	fn rejects_unrelated_url() {
		assert_eq!(parse_video_id("https://example.com/video"), None);
	}

	#[test]
	fn rejects_wrong_length_id() {
		assert_eq!(parse_video_id("https://youtu.be/short"), None);
	}
}
