// src/core/discovery.rs

use std::collections::BTreeSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Syntactic gate for every hostname the engine is willing to probe.
pub(crate) static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{1,62}$").unwrap()
});

/// Common subdomain prefixes tried against every target. Bounded on purpose:
/// the wordlist is a floor for coverage, the passive source is the ceiling.
static WORDLIST: &[&str] = &[
    "www", "mail", "webmail", "smtp", "imap", "pop", "mx", "ns1", "ns2", "api", "app", "dev",
    "staging", "stage", "test", "qa", "beta", "demo", "admin", "portal", "dashboard", "intranet",
    "internal", "vpn", "remote", "gateway", "proxy", "blog", "news", "shop", "store", "m",
    "mobile", "cdn", "static", "assets", "img", "media", "files", "docs", "wiki", "help",
    "support", "status", "monitor", "grafana", "jenkins", "ci", "git", "gitlab", "auth", "sso",
    "login", "db", "backup", "cloud",
];

/// One row of the crt.sh JSON response; `name_value` holds newline-separated
/// certificate subject names.
#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

/// Expands a root domain into a bounded, deduplicated candidate set.
///
/// Candidates come from the static wordlist plus a certificate-transparency
/// lookup. The passive source is best-effort: when it is unreachable or
/// returns garbage the discovery degrades silently to wordlist-only output.
/// The root domain itself is excluded; the orchestrator probes it
/// separately. Output order is deterministic (lexicographic).
pub async fn discover(
    client: &Client,
    domain: &str,
    max_candidates: usize,
    passive_timeout: Duration,
) -> Vec<String> {
    let mut candidates: BTreeSet<String> = WORDLIST
        .iter()
        .map(|prefix| format!("{prefix}.{domain}"))
        .collect();

    match crtsh_lookup(client, domain, passive_timeout).await {
        Ok(passive) => {
            info!(count = passive.len(), "certificate-transparency lookup succeeded");
            candidates.extend(passive);
        }
        Err(e) => {
            warn!(error = %e, "passive source unavailable, continuing with wordlist only");
        }
    }

    candidates.remove(domain);

    let total = candidates.len();
    let capped: Vec<String> = candidates.into_iter().take(max_candidates).collect();
    if capped.len() < total {
        debug!(total, kept = capped.len(), "candidate set truncated at cap");
    }
    capped
}

/// Queries crt.sh for certificates issued under `*.domain`.
async fn crtsh_lookup(
    client: &Client,
    domain: &str,
    timeout: Duration,
) -> Result<Vec<String>, String> {
    let url = format!("https://crt.sh/?q=%25.{domain}&output=json");
    debug!(url = %url, "querying certificate-transparency source");

    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!("crt.sh returned {}", response.status()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read response body: {e}"))?;

    parse_crtsh_body(&body, domain)
}

/// Extracts in-scope hostnames from a crt.sh JSON body.
///
/// Wildcard markers are stripped, names are lowercased, and anything that is
/// not syntactically a hostname under `domain` is dropped.
fn parse_crtsh_body(body: &str, domain: &str) -> Result<Vec<String>, String> {
    let entries: Vec<CrtShEntry> =
        serde_json::from_str(body).map_err(|e| format!("unexpected response shape: {e}"))?;

    let suffix = format!(".{domain}");
    let mut names = Vec::new();
    for entry in entries {
        for line in entry.name_value.lines() {
            let name = line.trim().trim_start_matches("*.").to_ascii_lowercase();
            if name.ends_with(&suffix) && HOSTNAME_RE.is_match(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
