//! Static, read-only catalog of every remediation the risk scorer can
//! recommend. Keeping the human-readable copy data-driven keeps the rule
//! evaluation in `risk` free of prose and lets the catalog grow without
//! touching scoring logic.

use crate::core::models::Severity;

/// Full detail for one remediation recommendation.
///
/// `id` is the stable machine-readable identifier the rule set and the
/// presentation layer key on; the remaining fields are the copy shown to
/// the user.
pub struct ActionDetail {
    pub id: &'static str,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub fix: &'static str,
}

/// The remediation catalog. One entry per rule in `risk::assess`.
static ACTIONS: &[ActionDetail] = &[
    ActionDetail {
        id: "renew-invalid-certificates",
        severity: Severity::Critical,
        title: "Fix invalid or missing TLS certificates",
        description: "One or more reachable subdomains serve no TLS certificate, or serve one that is expired, untrusted, or issued for a different hostname. Browsers will warn users away, and traffic to these hosts can be intercepted or spoofed.",
        fix: "Install a valid, trusted certificate for every reachable host. Automated issuance (e.g. Let's Encrypt with an ACME client) keeps certificates current without manual renewals.",
    },
    ActionDetail {
        id: "renew-expiring-certificates",
        severity: Severity::High,
        title: "Renew certificates expiring soon",
        description: "One or more certificates expire within the next two weeks. Once they lapse, browsers block access with full-page warnings and API clients start failing.",
        fix: "Renew the affected certificates now and verify that automated renewal is actually firing; an expiring cert usually means the automation broke silently.",
    },
    ActionDetail {
        id: "enable-subdomain-hsts",
        severity: Severity::High,
        title: "Enable HSTS on all subdomains",
        description: "Subdomains responding over HTTP(S) do not send Strict-Transport-Security. Without it, first visits and downgraded connections are exposed to protocol-downgrade attacks and cookie hijacking.",
        fix: "Send 'Strict-Transport-Security: max-age=31536000; includeSubDomains' from every host, or set it once at the edge/load balancer so new subdomains inherit it.",
    },
    ActionDetail {
        id: "enable-root-hsts",
        severity: Severity::High,
        title: "Enable HSTS on the root domain",
        description: "The root domain does not send Strict-Transport-Security, so browsers will still follow plain-HTTP links to it and can be downgraded by an active attacker.",
        fix: "Add 'Strict-Transport-Security: max-age=31536000; includeSubDomains' to root-domain responses; consider 'preload' once the whole estate is HTTPS-only.",
    },
    ActionDetail {
        id: "add-root-csp",
        severity: Severity::Medium,
        title: "Add a Content-Security-Policy to the root domain",
        description: "Without a CSP, any script injection on the root site runs unconstrained. CSP is the strongest browser-side mitigation for XSS and data-exfiltration payloads.",
        fix: "Ship a restrictive Content-Security-Policy (start from 'default-src 'self'') in report-only mode, review the reports, then enforce it.",
    },
    ActionDetail {
        id: "set-subdomain-frame-options",
        severity: Severity::Medium,
        title: "Set X-Frame-Options on all subdomains",
        description: "Subdomains that can be framed by arbitrary origins are usable for clickjacking: an attacker overlays your UI in an invisible iframe and harvests clicks.",
        fix: "Send 'X-Frame-Options: DENY' (or 'SAMEORIGIN' where framing is needed), or the equivalent 'frame-ancestors' CSP directive, from every host.",
    },
    ActionDetail {
        id: "add-root-content-type-options",
        severity: Severity::Low,
        title: "Add X-Content-Type-Options to the root domain",
        description: "Without 'nosniff', browsers may MIME-sniff responses and execute content that was never meant to be a script.",
        fix: "Send 'X-Content-Type-Options: nosniff' on every root-domain response; it is a one-line, no-risk hardening header.",
    },
    ActionDetail {
        id: "add-root-referrer-policy",
        severity: Severity::Low,
        title: "Add a Referrer-Policy to the root domain",
        description: "Without a Referrer-Policy, full URLs (including path and query parameters) leak to every third-party destination users click through to.",
        fix: "Send 'Referrer-Policy: strict-origin-when-cross-origin' (or stricter) from the root domain.",
    },
    ActionDetail {
        id: "add-root-permissions-policy",
        severity: Severity::Low,
        title: "Add a Permissions-Policy to the root domain",
        description: "Permissions-Policy lets you switch off powerful browser APIs (camera, microphone, geolocation) for your origin and any embedded content, shrinking the blast radius of injected scripts.",
        fix: "Send a Permissions-Policy disabling the features you do not use, e.g. 'camera=(), microphone=(), geolocation=()'.",
    },
];

/// Looks up the catalog entry for a rule id.
///
/// Returns `None` only for ids the catalog does not know, which in practice
/// means a rule/catalog mismatch introduced during development.
pub fn action_detail(id: &str) -> Option<&'static ActionDetail> {
    ACTIONS.iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_known_ids() {
        let detail = action_detail("renew-invalid-certificates").unwrap();
        assert_eq!(detail.severity, Severity::Critical);
        assert!(detail.title.to_lowercase().contains("certificate"));
    }

    #[test]
    fn lookup_misses_unknown_ids() {
        assert!(action_detail("no-such-rule").is_none());
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for action in ACTIONS {
            assert!(seen.insert(action.id), "duplicate catalog id {}", action.id);
        }
    }
}
