use std::process::Stdio;

use media_core::ports::ExtractError;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::ExtractorConfig;

/// Substrings in the subprocess's stderr recognized as an anti-bot challenge
/// rather than a generic failure (spec.md §4.2 error conditions: `blocked`).
const BLOCKED_MARKERS: &[&str] = &["sign in to confirm", "confirm you're not a bot", "http error 429"];

/// Layered argument strategy for subtitle retrieval (spec.md §4.2 step 1):
/// a proxy, if configured, also enables a VR-client argument (grounded on
/// yt-dlp's `android_vr` player client, one of the few clients that still
/// serves captions when the default web client is blocked behind a proxy
/// exit node); the JS-runtime extension is always enabled, since some
/// caption tracks are only exposed after running the page's player script.
#[must_use]
pub fn subtitle_args(config: &ExtractorConfig, url: &str) -> Vec<String> {
	let mut args = vec![
		"--skip-download".to_string(),
		"--write-auto-sub".to_string(),
		"--write-sub".to_string(),
		"--sub-format".to_string(),
		"vtt".to_string(),
		"--extractor-args".to_string(),
		"youtube:player_js_variant=main".to_string(),
		"-o".to_string(),
		"-".to_string(),
	];
	if let Some(proxy) = &config.proxy {
		args.push("--proxy".to_string());
		args.push(proxy.clone());
		args.push("--extractor-args".to_string());
		args.push("youtube:player_client=android_vr".to_string());
	}
	args.push(url.to_string());
	args
}

/// Audio-only download for the no-captions fallback (spec.md §4.2 step 3).
#[must_use]
pub fn audio_download_args(config: &ExtractorConfig, url: &str, out_path: &str) -> Vec<String> {
	let mut args = vec!["-f".to_string(), "bestaudio".to_string(), "--no-playlist".to_string(), "-o".to_string(), out_path.to_string()];
	if let Some(proxy) = &config.proxy {
		args.push("--proxy".to_string());
		args.push(proxy.clone());
	}
	args.push(url.to_string());
	args
}

/// Metadata probe: title, channel, duration (spec.md §4.2: `Extract` returns
/// `{title, channel, duration, ...}`).
#[must_use]
pub fn metadata_args(config: &ExtractorConfig, url: &str) -> Vec<String> {
	let mut args = vec!["--skip-download".to_string(), "--print".to_string(), "%(title)s\t%(channel)s\t%(duration)s".to_string()];
	if let Some(proxy) = &config.proxy {
		args.push("--proxy".to_string());
		args.push(proxy.clone());
	}
	args.push(url.to_string());
	args
}

/// Runs `config.binary_path` with `args`, capturing stdout, bounded by
/// `config.timeout` and cancellable via `ct`. The child is killed — never
/// leaked — on either cancellation or timeout (spec.md §5: "the
/// implementation must kill the child on cancellation, not leak it").
///
/// # Errors
/// [`ExtractError::SubprocessFailed`] on a non-zero exit that isn't
/// recognized as a block, [`ExtractError::Blocked`] when stderr matches a
/// known anti-bot response, [`ExtractError::Timeout`] past `config.timeout`,
/// [`ExtractError::Cancelled`] if `ct` fires first.
pub async fn run_capturing_stdout(ct: &CancellationToken, config: &ExtractorConfig, args: &[String]) -> Result<Vec<u8>, ExtractError> {
	let child = Command::new(&config.binary_path)
		.args(args)
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.stdin(Stdio::null())
		.kill_on_drop(true)
		.spawn()
		.map_err(|e| ExtractError::SubprocessFailed(format!("failed to spawn {}: {e}", config.binary_path)))?;

	// `select!` builds every branch's future up front, so the losing
	// branches never get a chance to touch `child` once the
	// `wait_with_output()` branch has taken it by value. `kill_on_drop(true)`
	// means that's fine: dropping the unpolled `wait_with_output()` future on
	// cancellation/timeout drops the `Child` inside it and kills the process.
	tokio::select! {
		biased;
		() = ct.cancelled() => {
			Err(ExtractError::Cancelled)
		}
		() = tokio::time::sleep(config.timeout) => {
			Err(ExtractError::Timeout)
		}
		output = child.wait_with_output() => {
			let output = output.map_err(|e| ExtractError::SubprocessFailed(format!("subprocess IO error: {e}")))?;
			if output.status.success() {
				Ok(output.stdout)
			} else {
				let stderr = String::from_utf8_lossy(&output.stderr).to_string();
				let lowered = stderr.to_ascii_lowercase();
				if BLOCKED_MARKERS.iter().any(|marker| lowered.contains(marker)) {
					tracing::warn!(binary = %config.binary_path, "subprocess response looked like an anti-bot block");
					Err(ExtractError::Blocked)
				} else {
					tracing::warn!(binary = %config.binary_path, %stderr, "subprocess exited non-zero");
					Err(ExtractError::SubprocessFailed(stderr))
				}
			}
		}
	}
}
