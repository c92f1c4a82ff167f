//! Request signing.
//!
//! OKX authenticates a request by HMAC-SHA256 over the concatenation
//! `<timestamp><METHOD><path><body>`, keyed with the account secret and
//! base64-encoded. REST calls use an ISO-8601 timestamp with millisecond
//! precision; the stream login uses a seconds-resolution epoch timestamp
//! over the fixed verify path.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const LOGIN_VERIFY_PATH: &str = "/users/self/verify";

/// Pure function of its inputs: base64(HMAC-SHA256(secret,
/// `<timestamp><METHOD><path><body>`)).
pub fn sign(timestamp: &str, method: &str, path: &str, body: &str, secret: &str) -> String {
    let message = format!("{}{}{}{}", timestamp, method.to_uppercase(), path, body);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(message.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Signature for the private-stream login frame: seconds-resolution
/// timestamp over `GET /users/self/verify` with an empty body.
pub fn login_sign(timestamp_s: i64, secret: &str) -> String {
    sign(&timestamp_s.to_string(), "GET", LOGIN_VERIFY_PATH, "", secret)
}

/// ISO-8601 with millisecond precision and trailing `Z`, the format OKX
/// expects in `OK-ACCESS-TIMESTAMP`.
pub fn rest_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn now_timestamp() -> String {
    rest_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn sign_is_deterministic() {
        let a = sign("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/balance", "", "secret");
        let b = sign("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/balance", "", "secret");
        assert_eq!(a, b);
        assert_ne!(a, sign("2024-01-01T00:00:00.001Z", "GET", "/api/v5/account/balance", "", "secret"));
        assert_ne!(a, sign("2024-01-01T00:00:00.000Z", "GET", "/api/v5/account/balance", "", "other"));
    }

    #[test]
    fn sign_hashes_the_literal_concatenation() {
        let timestamp = "2024-01-01T00:00:00.000Z";
        let method = "GET";
        let path = "/api/v5/account/balance";
        let body = "";
        let secret = "secret";

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}{method}{path}{body}").as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(sign(timestamp, method, path, body, secret), expected);
    }

    #[test]
    fn sign_uppercases_the_method() {
        assert_eq!(
            sign("ts", "post", "/p", "{}", "secret"),
            sign("ts", "POST", "/p", "{}", "secret"),
        );
    }

    #[test]
    fn login_sign_covers_the_verify_path() {
        let expected = sign("1700000000", "GET", "/users/self/verify", "", "secret");
        assert_eq!(login_sign(1_700_000_000, "secret"), expected);
    }

    #[test]
    fn rest_timestamp_has_millisecond_precision() {
        let ts = rest_timestamp(epoch(1_700_000_000_123));
        assert_eq!(ts, "2023-11-14T22:13:20.123Z");
    }
}
