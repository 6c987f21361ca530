// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Probe Outcomes ---

/// The result of a single probe primitive.
///
/// `Ok(Some(T))` is a usable partial result, `Ok(None)` means the probe ran
/// but the target had nothing to report (e.g. a TLS endpoint that presented
/// no certificate), and `Err` carries the reason the probe was unavailable
/// (timeout, connection refused, exhausted deadline). Probe failures are
/// data; they never cross the engine boundary as errors.
pub type ProbeOutcome<T> = Result<Option<T>, String>;

// --- Engine Errors ---

/// The only caller-visible failures of a scan.
///
/// Per-host and per-probe failures are absorbed into the result data; a
/// caller either gets a well-formed `ScanResultData` or one of these.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The input failed syntactic validation. Raised before any network I/O.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
    /// A programming or environment fault that prevents scanning at all.
    #[error("internal scanner fault: {0}")]
    Internal(String),
}

// --- Engine Options ---

/// Tuning knobs for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Width of the host-probe fan-out pool.
    pub concurrency: usize,
    /// Wall-clock budget for the whole scan, in milliseconds.
    pub global_timeout_ms: u64,
    /// Budget for any single network probe, in milliseconds.
    pub per_probe_timeout_ms: u64,
    /// Upper bound on discovered subdomain candidates.
    pub max_candidates: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 12,
            global_timeout_ms: 30_000,
            per_probe_timeout_ms: 5_000,
            max_candidates: 200,
        }
    }
}

// --- DNS Models ---

/// Root-domain DNS records, one list per record type.
///
/// An empty list means "no records of that type found"; lookup failures for
/// one type never blank out the others. Order is as returned by the
/// resolver and is irrelevant for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsInfo {
    pub a: Vec<String>,
    pub aaaa: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
    pub cname: Vec<String>,
}

// --- Security Header Models ---

/// Presence and raw value of one security header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderCheck {
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The six audited response headers plus their weighted 0-100 score.
///
/// `score` is a pure function of the six presence flags; see
/// `headers_scanner::score_headers` for the weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityHeadersResult {
    pub hsts: HeaderCheck,
    pub csp: HeaderCheck,
    pub x_frame_options: HeaderCheck,
    pub x_content_type_options: HeaderCheck,
    pub referrer_policy: HeaderCheck,
    pub permissions_policy: HeaderCheck,
    pub score: u8,
}

// --- Host Models ---

/// Everything the scan learned about a single hostname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdomainInfo {
    /// Fully-qualified hostname, lowercase, no trailing dot.
    pub name: String,
    /// Resolved A/AAAA addresses, sorted and deduplicated. Empty when
    /// resolution failed or returned nothing.
    pub ips: Vec<String>,
    pub has_cert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_expiry: Option<DateTime<Utc>>,
    pub cert_valid: bool,
    /// Absent (not zeroed) when the HTTP probe could not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_headers: Option<SecurityHeadersResult>,
    /// Deduplicated fingerprint labels; absent without an HTTP response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
}

impl SubdomainInfo {
    /// The short-circuit shape for a hostname with no A/AAAA records.
    /// No TLS or HTTP probes are attempted against such a host.
    pub fn unresolved(name: String) -> Self {
        Self {
            name,
            ips: Vec::new(),
            has_cert: false,
            cert_expiry: None,
            cert_valid: false,
            security_headers: None,
            technologies: None,
        }
    }
}

// --- Scan Result ---

/// Aggregated output of one scan run; the wire contract with the report sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResultData {
    /// Normalized input domain (scheme and path stripped, lowercased).
    pub domain: String,
    /// One entry per probed candidate, sorted by hostname.
    pub subdomains: Vec<SubdomainInfo>,
    /// The root domain's own records.
    pub dns: DnsInfo,
    /// Elapsed wall-clock milliseconds for the whole run.
    pub scan_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_security_headers: Option<SecurityHeadersResult>,
    /// Set when the global deadline stopped host probing early.
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

// --- Risk Models ---

/// Severity ladder for action items. Declaration order is rank order, so
/// deriving `Ord` gives critical-first sorting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Letter grade mapped from the numeric risk score via fixed bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

/// One aggregated, prioritized remediation recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub fix: String,
    /// How many findings this item aggregates; absent when not applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Output contract of the risk scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub grade: Grade,
    pub actions: Vec<ActionItem>,
}
