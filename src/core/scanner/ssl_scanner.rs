// src/core/scanner/ssl_scanner.rs

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::task::spawn_blocking;
use tracing::{debug, error};
use x509_parser::prelude::*;

use crate::core::models::ProbeOutcome;

/// What the TLS probe learned about a host's leaf certificate.
#[derive(Debug, Clone)]
pub struct CertProbe {
    /// True only when the chain is trusted, the hostname matches, and the
    /// certificate is inside its validity window.
    pub valid: bool,
    /// The leaf's not-after instant.
    pub not_after: DateTime<Utc>,
}

/// Probes port 443 for a leaf certificate.
///
/// The handshake runs on a blocking thread with socket-level timeouts; the
/// async side additionally bounds the whole task. `Ok(None)` means the
/// endpoint spoke TLS but presented no certificate; `Err` means no
/// certificate could be obtained at all (closed port, timeout, protocol
/// failure) and the host is recorded with `hasCert=false`.
pub async fn run_ssl_scan(host: &str, budget: Option<Duration>) -> ProbeOutcome<CertProbe> {
    let Some(budget) = budget else {
        return Err("global deadline exhausted before TLS probe".to_string());
    };

    debug!(host, "starting TLS certificate probe");
    let host_owned = host.to_string();
    let outcome = tokio::time::timeout(
        budget,
        spawn_blocking(move || perform_tls_probe(&host_owned, budget)),
    )
    .await;

    match outcome {
        Err(_) => Err("TLS probe exceeded its budget".to_string()),
        Ok(Err(join_error)) => {
            error!(host, error = %join_error, "TLS probe task failed");
            Err(format!("TLS probe task failed: {join_error}"))
        }
        Ok(Ok(result)) => result,
    }
}

/// Verified handshake first; on failure, an unverified retry so a
/// presented-but-invalid certificate still reports its expiry. "No
/// certificate at all" and "certificate that fails validation" are
/// different findings and must stay distinguishable in the result.
fn perform_tls_probe(host: &str, budget: Duration) -> ProbeOutcome<CertProbe> {
    match handshake(host, budget, false) {
        Ok(Some(der)) => {
            let (not_after, in_window) = parse_validity(&der)?;
            Ok(Some(CertProbe {
                valid: in_window,
                not_after,
            }))
        }
        Ok(None) => Ok(None),
        Err(verified_error) => {
            debug!(host, error = %verified_error, "verified handshake failed, retrying unverified");
            match handshake(host, budget, true) {
                Ok(Some(der)) => {
                    let (not_after, _) = parse_validity(&der)?;
                    Ok(Some(CertProbe {
                        valid: false,
                        not_after,
                    }))
                }
                Ok(None) => Ok(None),
                Err(_) => Err(verified_error),
            }
        }
    }
}

fn handshake(host: &str, budget: Duration, permissive: bool) -> Result<Option<Vec<u8>>, String> {
    let connector = if permissive {
        TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
    } else {
        TlsConnector::new()
    }
    .map_err(|e| format!("TLS connector setup failed: {e}"))?;

    let address = (host, 443u16)
        .to_socket_addrs()
        .map_err(|e| format!("address lookup failed: {e}"))?
        .next()
        .ok_or_else(|| "no address for host".to_string())?;

    let stream = TcpStream::connect_timeout(&address, budget)
        .map_err(|e| format!("TCP connect failed: {e}"))?;
    stream
        .set_read_timeout(Some(budget))
        .map_err(|e| format!("socket setup failed: {e}"))?;
    stream
        .set_write_timeout(Some(budget))
        .map_err(|e| format!("socket setup failed: {e}"))?;

    let tls = connector
        .connect(host, stream)
        .map_err(|e| format!("TLS handshake failed: {e}"))?;

    match tls.peer_certificate() {
        Ok(Some(cert)) => cert
            .to_der()
            .map(Some)
            .map_err(|e| format!("certificate encoding failed: {e}")),
        Ok(None) => Ok(None),
        Err(e) => Err(format!("could not read peer certificate: {e}")),
    }
}

fn parse_validity(der: &[u8]) -> Result<(DateTime<Utc>, bool), String> {
    let (_, cert) =
        parse_x509_certificate(der).map_err(|e| format!("X.509 parse error: {e}"))?;
    let validity = cert.validity();
    let not_before = asn1_time_to_utc(&validity.not_before);
    let not_after = asn1_time_to_utc(&validity.not_after);
    let now = Utc::now();
    Ok((not_after, now > not_before && now < not_after))
}

fn asn1_time_to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
