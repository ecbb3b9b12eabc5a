use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::error::{BridgeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Query parameters whose values are credentials.
const SECRET_QUERY_PARAMS: &[&str] = &["private_token", "token"];
const REDACTED: &str = "REDACTED";

pub const GITLAB_TOKEN_HEADER: &str = "X-Gitlab-Token";

/// Render a URL for logs and error messages with credential query values masked.
pub fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if SECRET_QUERY_PARAMS.contains(&key.as_ref()) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Check the `X-Gitlab-Token` header against the configured webhook secret.
/// No secret configured means no check.
pub fn verify_gitlab_token(secret: Option<&SecretString>, headers: &HeaderMap) -> Result<()> {
    let Some(secret) = secret else {
        return Ok(());
    };

    match headers
        .get(GITLAB_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(supplied) if tokens_match(secret.expose_secret(), supplied) => Ok(()),
        Some(_) => Err(BridgeError::WebhookValidationFailed(format!(
            "{} does not match",
            GITLAB_TOKEN_HEADER
        ))),
        None => Err(BridgeError::WebhookValidationFailed(format!(
            "missing {} header",
            GITLAB_TOKEN_HEADER
        ))),
    }
}

/// Constant-time comparison: both values are MACed under the secret and the
/// tags compared with `verify_slice`.
fn tokens_match(secret: &str, supplied: &str) -> bool {
    let tag = |value: &str| {
        HmacSha256::new_from_slice(secret.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };
    match (tag(secret), tag(supplied)) {
        (Ok(expected), Ok(candidate)) => candidate
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn redacts_private_and_trigger_tokens() {
        let url = Url::parse(
            "https://gitlab.example.com/api/v4/projects/42/trigger/pipeline?ref=feature%2Fx&token=abc&private_token=glpat-1",
        )
        .unwrap();
        let shown = redact_url(&url);
        assert!(!shown.contains("abc"));
        assert!(!shown.contains("glpat-1"));
        assert!(shown.contains("ref=feature%2Fx"));
        assert!(shown.contains("token=REDACTED"));
        assert!(shown.contains("private_token=REDACTED"));
    }

    #[test]
    fn leaves_urls_without_query_untouched() {
        let url = Url::parse("https://gitlab.example.com/api/v4/projects/42/triggers").unwrap();
        assert_eq!(
            redact_url(&url),
            "https://gitlab.example.com/api/v4/projects/42/triggers"
        );
    }

    #[test]
    fn token_check_is_skipped_without_secret() {
        assert!(verify_gitlab_token(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn token_check_requires_matching_header() {
        let secret = SecretString::from("hook-secret".to_string());

        let missing = verify_gitlab_token(Some(&secret), &HeaderMap::new());
        assert!(matches!(
            missing,
            Err(BridgeError::WebhookValidationFailed(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(GITLAB_TOKEN_HEADER, HeaderValue::from_static("wrong"));
        assert!(verify_gitlab_token(Some(&secret), &headers).is_err());

        headers.insert(GITLAB_TOKEN_HEADER, HeaderValue::from_static("hook-secret"));
        assert!(verify_gitlab_token(Some(&secret), &headers).is_ok());
    }

    #[test]
    fn token_comparison_rejects_prefixes_and_extensions() {
        assert!(tokens_match("hook-secret", "hook-secret"));
        assert!(!tokens_match("hook-secret", "hook-secre"));
        assert!(!tokens_match("hook-secret", "hook-secret-and-more"));
        assert!(!tokens_match("hook-secret", ""));
    }
}
