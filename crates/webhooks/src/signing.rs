use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the raw request body, hex-encoded (spec.md §4.8: the
/// `X-Webhook-Signature` header is `sha256=<hex>`).
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
	mac.update(body);
	hex::encode(mac.finalize().into_bytes())
}

/// Verifies a `sha256=<hex>` header value against `body`, in constant time.
#[must_use]
pub fn verify(secret: &str, body: &[u8], header_value: &str) -> bool {
	let Some(hex_sig) = header_value.strip_prefix("sha256=") else {
		return false;
	};
	let Ok(sig_bytes) = hex::decode(hex_sig) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
		return false;
	};
	mac.update(body);
	mac.verify_slice(&sig_bytes).is_ok()
}

/// A fresh, cryptographically random signing secret for a newly created
/// webhook (spec.md §4.8: generated once, returned to the creator exactly
/// once, never re-readable afterwards).
#[must_use]
pub fn generate_secret() -> String {
	let mut bytes = [0u8; 32];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sign_is_deterministic() {
		assert_eq!(sign("secret", b"body"), sign("secret", b"body"));
	}

	#[test]
	fn verify_round_trips() {
		let body = br#"{"a":1}"#;
		let signature = sign("secret", body);
		assert!(verify("secret", body, &format!("sha256={signature}")));
	}

	#[test]
	fn verify_rejects_mutated_body() {
		let signature = sign("secret", br#"{"a":1}"#);
		assert!(!verify("secret", br#"{"a":2}"#, &format!("sha256={signature}")));
	}

	#[test]
	fn verify_rejects_missing_prefix() {
		let signature = sign("secret", b"body");
		assert!(!verify("secret", b"body", &signature));
	}

	#[test]
	fn generate_secret_is_64_hex_chars() {
		let secret = generate_secret();
		assert_eq!(secret.len(), 64);
		assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
	}
}
