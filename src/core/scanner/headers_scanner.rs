// src/core/scanner/headers_scanner.rs

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::{debug, warn};

use crate::core::models::{HeaderCheck, ProbeOutcome, SecurityHeadersResult};

// Per-header weights for the 0-100 score. They must sum to 100; the test
// suite asserts it. HSTS and CSP carry the most weight: they are the two
// headers with the largest real-world risk reduction.
const HSTS_WEIGHT: u8 = 25;
const CSP_WEIGHT: u8 = 25;
const X_FRAME_OPTIONS_WEIGHT: u8 = 15;
const X_CONTENT_TYPE_OPTIONS_WEIGHT: u8 = 15;
const REFERRER_POLICY_WEIGHT: u8 = 10;
const PERMISSIONS_POLICY_WEIGHT: u8 = 10;

/// Raw material captured by the single HTTP fetch against a host.
///
/// Both the header scorer and the technology fingerprinter consume this,
/// so one request serves both probes.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub status: u16,
    pub headers: HeaderMap,
    /// All `set-cookie` values joined for signature matching.
    pub cookies: String,
    pub body: String,
}

/// Issues one GET against the host, preferring HTTPS and falling back to
/// plain HTTP within the same time budget.
///
/// A `None` budget means the global deadline is already spent; the probe
/// resolves immediately as unavailable. Connection failure on both schemes
/// is likewise unavailable; the caller must represent that as absent
/// header data, never as all-false.
pub async fn fetch_http(
    client: &Client,
    host: &str,
    budget: Option<Duration>,
) -> ProbeOutcome<HttpProbe> {
    let Some(budget) = budget else {
        return Err("global deadline exhausted before HTTP probe".to_string());
    };

    let started = Instant::now();
    let mut last_error = String::from("no scheme attempted");

    for scheme in ["https", "http"] {
        let Some(remaining) = budget.checked_sub(started.elapsed()) else {
            last_error = format!("budget exhausted before {scheme} attempt");
            break;
        };

        let url = format!("{scheme}://{host}/");
        debug!(url = %url, "issuing header probe request");
        match client.get(&url).timeout(remaining).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers = response.headers().clone();
                let cookies = headers
                    .get_all(SET_COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect::<Vec<_>>()
                    .join("; ");
                // A body that fails to stream is not fatal: the headers are
                // already in hand and fingerprinting degrades gracefully.
                let body = response.text().await.unwrap_or_default();
                debug!(host, status, bytes = body.len(), "header probe succeeded");
                return Ok(Some(HttpProbe {
                    status,
                    headers,
                    cookies,
                    body,
                }));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "header probe request failed");
                last_error = format!("{scheme} request failed: {e}");
            }
        }
    }

    Err(last_error)
}

/// Scores a response's security headers. Pure and deterministic: the same
/// header map always produces the same presence flags and score.
pub fn score_headers(headers: &HeaderMap) -> SecurityHeadersResult {
    let hsts = check_header(headers, "strict-transport-security");
    let csp = check_header(headers, "content-security-policy");
    let x_frame_options = check_header(headers, "x-frame-options");
    let x_content_type_options = check_header(headers, "x-content-type-options");
    let referrer_policy = check_header(headers, "referrer-policy");
    let permissions_policy = check_header(headers, "permissions-policy");

    let mut score: u32 = 0;
    for (check, weight) in [
        (&hsts, HSTS_WEIGHT),
        (&csp, CSP_WEIGHT),
        (&x_frame_options, X_FRAME_OPTIONS_WEIGHT),
        (&x_content_type_options, X_CONTENT_TYPE_OPTIONS_WEIGHT),
        (&referrer_policy, REFERRER_POLICY_WEIGHT),
        (&permissions_policy, PERMISSIONS_POLICY_WEIGHT),
    ] {
        if check.present {
            score += u32::from(weight);
        }
    }

    SecurityHeadersResult {
        hsts,
        csp,
        x_frame_options,
        x_content_type_options,
        referrer_policy,
        permissions_policy,
        score: score.min(100) as u8,
    }
}

/// Presence and value of one header. Lookup is case-insensitive by
/// construction of `HeaderMap`; a value that is not valid UTF-8 still
/// counts as present, with a placeholder value.
fn check_header(headers: &HeaderMap, name: &str) -> HeaderCheck {
    match headers.get(name) {
        Some(value) => match value.to_str() {
            Ok(s) => HeaderCheck {
                present: true,
                value: Some(s.to_string()),
            },
            Err(_) => HeaderCheck {
                present: true,
                value: Some("[invalid UTF-8]".to_string()),
            },
        },
        None => HeaderCheck::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    const ALL_SIX: &[(&str, &str)] = &[
        ("strict-transport-security", "max-age=63072000"),
        ("content-security-policy", "default-src 'self'"),
        ("x-frame-options", "DENY"),
        ("x-content-type-options", "nosniff"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("permissions-policy", "camera=()"),
    ];

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn weights_sum_to_one_hundred() {
        let total = u32::from(HSTS_WEIGHT)
            + u32::from(CSP_WEIGHT)
            + u32::from(X_FRAME_OPTIONS_WEIGHT)
            + u32::from(X_CONTENT_TYPE_OPTIONS_WEIGHT)
            + u32::from(REFERRER_POLICY_WEIGHT)
            + u32::from(PERMISSIONS_POLICY_WEIGHT);
        assert_eq!(total, 100);
    }

    #[test]
    fn all_headers_score_one_hundred_and_none_scores_zero() {
        let full = score_headers(&header_map(ALL_SIX));
        assert_eq!(full.score, 100);
        assert!(full.hsts.present && full.permissions_policy.present);

        let empty = score_headers(&HeaderMap::new());
        assert_eq!(empty.score, 0);
        assert!(!empty.hsts.present);
        assert_eq!(empty.hsts.value, None);
    }

    #[test]
    fn each_additional_header_strictly_increases_the_score() {
        for i in 0..ALL_SIX.len() {
            let without = score_headers(&header_map(&ALL_SIX[..i]));
            let with = score_headers(&header_map(&ALL_SIX[..=i]));
            assert!(
                with.score > without.score,
                "adding {} did not increase the score",
                ALL_SIX[i].0
            );
        }
    }

    #[test]
    fn scoring_is_deterministic_and_idempotent() {
        let headers = header_map(&ALL_SIX[..3]);
        let first = score_headers(&headers);
        let second = score_headers(&headers);
        assert_eq!(first, second);
        assert_eq!(first.score, 65); // hsts 25 + csp 25 + x-frame-options 15
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"Strict-Transport-Security").unwrap(),
            HeaderValue::from_static("max-age=300"),
        );
        let result = score_headers(&headers);
        assert!(result.hsts.present);
        assert_eq!(result.hsts.value.as_deref(), Some("max-age=300"));
        assert_eq!(result.score, 25);
    }

    #[test]
    fn value_is_populated_only_when_present() {
        let result = score_headers(&header_map(&ALL_SIX[..1]));
        assert_eq!(result.hsts.value.as_deref(), Some("max-age=63072000"));
        assert_eq!(result.csp.value, None);
        assert!(!result.csp.present);
    }

    #[test]
    fn non_utf8_value_still_counts_as_present() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_bytes(b"DENY\xff").unwrap(),
        );
        let result = score_headers(&headers);
        assert!(result.x_frame_options.present);
        assert_eq!(result.score, 15);
    }
}
