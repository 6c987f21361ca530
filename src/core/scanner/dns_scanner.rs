// src/core/scanner/dns_scanner.rs

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::proto::rr::RecordType;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::models::DnsInfo;

/// Resolves the root domain's A, AAAA, MX, TXT and CNAME records.
///
/// All five lookups run concurrently against the shared resolver, each
/// bounded by the same budget. A failure of one record type (NXDOMAIN,
/// timeout, empty answer) yields an empty list for that type only and
/// never blanks out the other four.
pub async fn run_dns_scan(
    resolver: &TokioAsyncResolver,
    domain: &str,
    budget: Option<Duration>,
) -> DnsInfo {
    let Some(budget) = budget else {
        warn!(domain, "global deadline exhausted before DNS record scan");
        return DnsInfo::default();
    };

    info!(domain, "starting DNS record scan");
    let (a, aaaa, mx, txt, cname) = tokio::join!(
        lookup_a(resolver, domain, budget),
        lookup_aaaa(resolver, domain, budget),
        lookup_mx(resolver, domain, budget),
        lookup_txt(resolver, domain, budget),
        lookup_cname(resolver, domain, budget),
    );

    let info = DnsInfo { a, aaaa, mx, txt, cname };
    debug!(
        domain,
        a = info.a.len(),
        aaaa = info.aaaa.len(),
        mx = info.mx.len(),
        txt = info.txt.len(),
        cname = info.cname.len(),
        "DNS record scan finished"
    );
    info
}

/// Resolves a hostname to its A/AAAA addresses for the host prober.
///
/// Returns a sorted, deduplicated list; empty means the host did not
/// resolve (or the budget was already spent), which short-circuits all
/// further probes against it.
pub async fn resolve_ips(
    resolver: &TokioAsyncResolver,
    host: &str,
    budget: Option<Duration>,
) -> Vec<String> {
    let Some(budget) = budget else {
        return Vec::new();
    };

    match timeout(budget, resolver.lookup_ip(host)).await {
        Ok(Ok(lookup)) => {
            let addresses: BTreeSet<IpAddr> = lookup.iter().collect();
            addresses.into_iter().map(|ip| ip.to_string()).collect()
        }
        Ok(Err(e)) => {
            debug!(host, error = %e, "address resolution failed");
            Vec::new()
        }
        Err(_) => {
            warn!(host, "address resolution timed out");
            Vec::new()
        }
    }
}

async fn lookup_a(resolver: &TokioAsyncResolver, domain: &str, budget: Duration) -> Vec<String> {
    match timeout(budget, resolver.ipv4_lookup(domain)).await {
        Ok(Ok(records)) => records.iter().map(|r| r.to_string()).collect(),
        Ok(Err(e)) => {
            debug!(domain, error = %e, "A lookup empty or failed");
            Vec::new()
        }
        Err(_) => {
            warn!(domain, "A lookup timed out");
            Vec::new()
        }
    }
}

async fn lookup_aaaa(resolver: &TokioAsyncResolver, domain: &str, budget: Duration) -> Vec<String> {
    match timeout(budget, resolver.ipv6_lookup(domain)).await {
        Ok(Ok(records)) => records.iter().map(|r| r.to_string()).collect(),
        Ok(Err(e)) => {
            debug!(domain, error = %e, "AAAA lookup empty or failed");
            Vec::new()
        }
        Err(_) => {
            warn!(domain, "AAAA lookup timed out");
            Vec::new()
        }
    }
}

async fn lookup_mx(resolver: &TokioAsyncResolver, domain: &str, budget: Duration) -> Vec<String> {
    match timeout(budget, resolver.mx_lookup(domain)).await {
        Ok(Ok(records)) => records.iter().map(|r| r.to_string()).collect(),
        Ok(Err(e)) => {
            debug!(domain, error = %e, "MX lookup empty or failed");
            Vec::new()
        }
        Err(_) => {
            warn!(domain, "MX lookup timed out");
            Vec::new()
        }
    }
}

async fn lookup_txt(resolver: &TokioAsyncResolver, domain: &str, budget: Duration) -> Vec<String> {
    match timeout(budget, resolver.txt_lookup(domain)).await {
        Ok(Ok(records)) => records.iter().map(|r| r.to_string()).collect(),
        Ok(Err(e)) => {
            debug!(domain, error = %e, "TXT lookup empty or failed");
            Vec::new()
        }
        Err(_) => {
            warn!(domain, "TXT lookup timed out");
            Vec::new()
        }
    }
}

async fn lookup_cname(resolver: &TokioAsyncResolver, domain: &str, budget: Duration) -> Vec<String> {
    match timeout(budget, resolver.lookup(domain, RecordType::CNAME)).await {
        Ok(Ok(records)) => records.iter().map(|r| r.to_string()).collect(),
        Ok(Err(e)) => {
            debug!(domain, error = %e, "CNAME lookup empty or failed");
            Vec::new()
        }
        Err(_) => {
            warn!(domain, "CNAME lookup timed out");
            Vec::new()
        }
    }
}
