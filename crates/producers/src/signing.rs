//! HMAC-SHA256 request signing for webhook producers.
//!
//! The signed material is `"{timestamp_ms}.{body}"`, so a captured request
//! cannot be replayed under a fresh timestamp. Receivers reject timestamps
//! more than [`MAX_TIMESTAMP_DRIFT_MS`] away from their own clock.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-ArenaGuard-Signature";
pub const TIMESTAMP_HEADER: &str = "X-ArenaGuard-Timestamp";
pub const AGENT_ID_HEADER: &str = "X-ArenaGuard-Agent-Id";

/// Five minutes.
pub const MAX_TIMESTAMP_DRIFT_MS: i64 = 5 * 60 * 1000;

fn mac_for(secret: &str, timestamp_ms: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp_ms.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Header value `sha256=<hex>` for the given request.
pub fn sign_payload(secret: &str, timestamp_ms: i64, body: &[u8]) -> String {
    let digest = mac_for(secret, timestamp_ms, body).finalize().into_bytes();
    format!("sha256={}", hex::encode(digest))
}

/// Constant-time check of a signature header, plus the replay window.
pub fn verify_signature(
    secret: &str,
    timestamp_ms: i64,
    body: &[u8],
    signature: &str,
    now_ms: i64,
) -> bool {
    if now_ms.abs_diff(timestamp_ms) > MAX_TIMESTAMP_DRIFT_MS.unsigned_abs() {
        return false;
    }
    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided) = hex::decode(sig_hex) else {
        return false;
    };
    mac_for(secret, timestamp_ms, body)
        .verify_slice(&provided)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn signature_verifies() {
        let body = br#"{"turnNumber":1}"#;
        let sig = sign_payload("s3cret", NOW, body);
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
        assert!(verify_signature("s3cret", NOW, body, &sig, NOW + 1_000));
    }

    #[test]
    fn wrong_secret_or_body_rejected() {
        let sig = sign_payload("s3cret", NOW, b"a");
        assert!(!verify_signature("other", NOW, b"a", &sig, NOW));
        assert!(!verify_signature("s3cret", NOW, b"b", &sig, NOW));
    }

    #[test]
    fn timestamp_is_bound_into_signature() {
        let sig = sign_payload("s3cret", NOW, b"a");
        assert!(!verify_signature("s3cret", NOW + 1, b"a", &sig, NOW));
    }

    #[test]
    fn stale_requests_rejected() {
        let old = NOW - MAX_TIMESTAMP_DRIFT_MS - 1;
        let sig = sign_payload("s3cret", old, b"a");
        assert!(!verify_signature("s3cret", old, b"a", &sig, NOW));
        let edge = NOW - MAX_TIMESTAMP_DRIFT_MS;
        let sig = sign_payload("s3cret", edge, b"a");
        assert!(verify_signature("s3cret", edge, b"a", &sig, NOW));
    }

    #[test]
    fn extreme_timestamps_rejected_without_overflow() {
        for ts in [i64::MIN, i64::MAX, i64::MIN + 1, -1] {
            assert!(!verify_signature("s", ts, b"a", "sha256=00", NOW), "{ts}");
        }
        assert!(!verify_signature("s", NOW, b"a", "sha256=00", i64::MIN));
        assert!(!verify_signature("s", i64::MAX, b"a", "sha256=00", i64::MIN));

        let sig = sign_payload("s", i64::MAX, b"a");
        assert!(verify_signature("s", i64::MAX, b"a", &sig, i64::MAX));
    }

    #[test]
    fn malformed_headers_rejected() {
        assert!(!verify_signature("s", NOW, b"a", "md5=abcd", NOW));
        assert!(!verify_signature("s", NOW, b"a", "sha256=not-hex", NOW));
        assert!(!verify_signature("s", NOW, b"a", "", NOW));
    }
}
