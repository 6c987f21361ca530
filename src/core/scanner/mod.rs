// src/core/scanner/mod.rs

pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod ssl_scanner;

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::{StreamExt, stream};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::discovery::{self, HOSTNAME_RE};
use crate::core::models::{ScanError, ScanOptions, ScanResultData, SubdomainInfo};

const USER_AGENT: &str = concat!("palisade-rs/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

/// Runs the full scan pipeline for one domain.
///
/// Normalizes and validates the input (rejecting it before any network
/// I/O), discovers candidate subdomains, probes the root and every
/// candidate under a bounded-concurrency pool, and assembles the result.
/// The whole run sits under a global wall-clock deadline: candidates
/// reached after it are recorded with their unavailable shape and the
/// result is flagged `partial` instead of failing, so one slow host can
/// never deny results for the rest.
pub async fn run_scan(input: &str, options: &ScanOptions) -> Result<ScanResultData, ScanError> {
    let domain = normalize_domain(input)?;
    let started = Instant::now();
    let deadline = started + Duration::from_millis(options.global_timeout_ms);
    let per_probe = Duration::from_millis(options.per_probe_timeout_ms);

    info!(
        domain = %domain,
        concurrency = options.concurrency,
        global_timeout_ms = options.global_timeout_ms,
        "starting scan"
    );

    // Shared, read-only-configured across every concurrent probe.
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    let client = build_http_client(per_probe)?;

    let candidates = discovery::discover(
        &client,
        &domain,
        options.max_candidates,
        probe_budget(deadline, per_probe).unwrap_or(per_probe),
    )
    .await;
    info!(candidates = candidates.len(), "discovery complete");

    let (dns, root_http) = tokio::join!(
        dns_scanner::run_dns_scan(&resolver, &domain, probe_budget(deadline, per_probe)),
        headers_scanner::fetch_http(&client, &domain, probe_budget(deadline, per_probe)),
    );
    let root_security_headers = match root_http {
        Ok(Some(probe)) => Some(headers_scanner::score_headers(&probe.headers)),
        Ok(None) | Err(_) => None,
    };

    let probed: Vec<ProbedHost> = stream::iter(candidates)
        .map(|host| probe_host(&resolver, &client, host, per_probe, deadline))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    let partial = probed.iter().any(|p| p.deadline_hit);
    if partial {
        warn!(domain = %domain, "global deadline reached, returning partial results");
    }

    // Collection order is completion order; sort so it never leaks out.
    let mut subdomains: Vec<SubdomainInfo> = probed.into_iter().map(|p| p.info).collect();
    subdomains.sort_by(|a, b| a.name.cmp(&b.name));

    let scan_time = started.elapsed().as_millis() as u64;
    info!(domain = %domain, subdomains = subdomains.len(), scan_time, "scan finished");

    Ok(ScanResultData {
        domain,
        subdomains,
        dns,
        scan_time,
        scanned_at: Some(Utc::now()),
        root_security_headers,
        partial,
    })
}

/// Normalizes raw user input (scheme, path, port, trailing dot, case) down
/// to a bare lowercase domain and validates it syntactically.
pub fn normalize_domain(input: &str) -> Result<String, ScanError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScanError::InvalidDomain("empty input".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let host = Url::parse(&with_scheme)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .ok_or_else(|| ScanError::InvalidDomain(trimmed.to_string()))?;

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if HOSTNAME_RE.is_match(&host) {
        Ok(host)
    } else {
        Err(ScanError::InvalidDomain(trimmed.to_string()))
    }
}

fn build_http_client(connect_timeout: Duration) -> Result<Client, ScanError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| ScanError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Budget for the next network call: the per-probe cap shrunk to whatever
/// is left on the global deadline. `None` once the deadline has passed.
fn probe_budget(deadline: Instant, per_probe: Duration) -> Option<Duration> {
    let remaining = deadline.checked_duration_since(Instant::now())?;
    if remaining.is_zero() {
        return None;
    }
    Some(remaining.min(per_probe))
}

struct ProbedHost {
    info: SubdomainInfo,
    /// True when the global deadline prevented this host from being probed.
    deadline_hit: bool,
}

/// Probes a single hostname and merges the primitives into one
/// `SubdomainInfo`. DNS runs first; a host with no A/AAAA records
/// short-circuits without any TLS/HTTP traffic. Otherwise the TLS probe
/// and the HTTP fetch run concurrently, and fingerprinting reuses the
/// fetched response. Probe failures degrade the affected fields to their
/// unavailable shape; nothing escapes this function.
async fn probe_host(
    resolver: &TokioAsyncResolver,
    client: &Client,
    name: String,
    per_probe: Duration,
    deadline: Instant,
) -> ProbedHost {
    let Some(dns_budget) = probe_budget(deadline, per_probe) else {
        debug!(host = %name, "deadline reached before probing");
        return ProbedHost {
            info: SubdomainInfo::unresolved(name),
            deadline_hit: true,
        };
    };

    let ips = dns_scanner::resolve_ips(resolver, &name, Some(dns_budget)).await;
    if ips.is_empty() {
        debug!(host = %name, "no A/AAAA records, skipping TLS and HTTP probes");
        return ProbedHost {
            info: SubdomainInfo::unresolved(name),
            deadline_hit: false,
        };
    }

    let (cert, http) = tokio::join!(
        ssl_scanner::run_ssl_scan(&name, probe_budget(deadline, per_probe)),
        headers_scanner::fetch_http(client, &name, probe_budget(deadline, per_probe)),
    );

    let (security_headers, technologies) = match &http {
        Ok(Some(probe)) => (
            Some(headers_scanner::score_headers(&probe.headers)),
            Some(fingerprint_scanner::run_fingerprint_scan(probe)),
        ),
        Ok(None) | Err(_) => (None, None),
    };

    let (has_cert, cert_valid, cert_expiry) = match cert {
        Ok(Some(c)) => (true, c.valid, Some(c.not_after)),
        Ok(None) | Err(_) => (false, false, None),
    };

    ProbedHost {
        info: SubdomainInfo {
            name,
            ips,
            has_cert,
            cert_expiry,
            cert_valid,
            security_headers,
            technologies,
        },
        deadline_hit: false,
    }
}
