// src/core/risk.rs

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

use crate::core::knowledge_base::action_detail;
use crate::core::models::{
    ActionItem, Grade, RiskAssessment, ScanResultData, SubdomainInfo,
};

// Overall-score formula, validated by the test suite below:
//
//   header_component = 0.4 * root_header_score + 0.6 * mean(subdomain header scores)
//                      (whichever side exists when only one does; 50 when neither does)
//   score = clamp(round(header_component
//                       - 12 * bad_cert_hosts
//                       - 4  * certs_expiring_within_14_days), 0, 100)
//
// Subdomains without header data are excluded from the mean, not counted as
// zero. A bad-cert host is a resolvable host with hasCert=false or
// certValid=false; the expiry penalty applies only to otherwise-valid certs.
const ROOT_HEADER_WEIGHT: f64 = 0.4;
const SUBDOMAIN_HEADER_WEIGHT: f64 = 0.6;
const NEUTRAL_HEADER_BASELINE: f64 = 50.0;
const BAD_CERT_PENALTY: f64 = 12.0;
const EXPIRING_CERT_PENALTY: f64 = 4.0;

/// Certificates valid for fewer days than this draw the expiry penalty.
pub const EXPIRY_HORIZON_DAYS: i64 = 14;

/// Scores a scan result against the current clock.
pub fn assess(result: &ScanResultData) -> RiskAssessment {
    assess_at(result, Utc::now())
}

/// Deterministic core of `assess`; tests pin `now` here.
pub fn assess_at(result: &ScanResultData, now: DateTime<Utc>) -> RiskAssessment {
    let score = compute_score(result, now);
    let grade = grade_for(score);
    let actions = evaluate_rules(result, now);
    debug!(domain = %result.domain, score, %grade, actions = actions.len(), "risk assessment complete");
    RiskAssessment { score, grade, actions }
}

/// Maps a score onto the letter bands. Lower bounds are inclusive:
/// >=90 A, >=80 B, >=60 C, >=40 D, else F.
pub fn grade_for(score: u8) -> Grade {
    match score {
        90.. => Grade::A,
        80..=89 => Grade::B,
        60..=79 => Grade::C,
        40..=59 => Grade::D,
        _ => Grade::F,
    }
}

fn compute_score(result: &ScanResultData, now: DateTime<Utc>) -> u8 {
    let root = result
        .root_security_headers
        .as_ref()
        .map(|h| f64::from(h.score));

    let subdomain_scores: Vec<f64> = result
        .subdomains
        .iter()
        .filter_map(|s| s.security_headers.as_ref())
        .map(|h| f64::from(h.score))
        .collect();
    let subdomain_mean = if subdomain_scores.is_empty() {
        None
    } else {
        Some(subdomain_scores.iter().sum::<f64>() / subdomain_scores.len() as f64)
    };

    let header_component = match (root, subdomain_mean) {
        (Some(r), Some(m)) => ROOT_HEADER_WEIGHT * r + SUBDOMAIN_HEADER_WEIGHT * m,
        (Some(r), None) => r,
        (None, Some(m)) => m,
        (None, None) => NEUTRAL_HEADER_BASELINE,
    };

    let bad_certs = result.subdomains.iter().filter(|s| has_bad_cert(s)).count();
    let expiring = result
        .subdomains
        .iter()
        .filter(|s| cert_expires_soon(s, now))
        .count();

    let raw = header_component
        - BAD_CERT_PENALTY * bad_certs as f64
        - EXPIRING_CERT_PENALTY * expiring as f64;
    raw.round().clamp(0.0, 100.0) as u8
}

/// A resolvable host that presents no certificate, or an invalid one.
/// Unresolvable hosts are skipped: nothing answers on 443 there.
fn has_bad_cert(info: &SubdomainInfo) -> bool {
    !info.ips.is_empty() && (!info.has_cert || !info.cert_valid)
}

/// A currently-valid certificate inside the renewal horizon.
fn cert_expires_soon(info: &SubdomainInfo, now: DateTime<Utc>) -> bool {
    info.cert_valid
        && info
            .cert_expiry
            .is_some_and(|expiry| expiry > now && expiry - now <= Duration::days(EXPIRY_HORIZON_DAYS))
}

/// Evaluates the fixed rule list in order, then sorts by severity rank.
/// The sort is stable, so equal severities keep rule-evaluation order;
/// that ordering is the contract the action-list consumer relies on.
fn evaluate_rules(result: &ScanResultData, now: DateTime<Utc>) -> Vec<ActionItem> {
    let mut actions = Vec::new();

    let bad_certs = result.subdomains.iter().filter(|s| has_bad_cert(s)).count();
    if bad_certs > 0 {
        push_action(&mut actions, "renew-invalid-certificates", Some(bad_certs));
    }

    let expiring = result
        .subdomains
        .iter()
        .filter(|s| cert_expires_soon(s, now))
        .count();
    if expiring > 0 {
        push_action(&mut actions, "renew-expiring-certificates", Some(expiring));
    }

    let missing_hsts = result
        .subdomains
        .iter()
        .filter(|s| s.security_headers.as_ref().is_some_and(|h| !h.hsts.present))
        .count();
    if missing_hsts > 0 {
        push_action(&mut actions, "enable-subdomain-hsts", Some(missing_hsts));
    }

    if let Some(root) = &result.root_security_headers {
        if !root.hsts.present {
            push_action(&mut actions, "enable-root-hsts", None);
        }
        if !root.csp.present {
            push_action(&mut actions, "add-root-csp", None);
        }
    }

    let missing_xfo = result
        .subdomains
        .iter()
        .filter(|s| {
            s.security_headers
                .as_ref()
                .is_some_and(|h| !h.x_frame_options.present)
        })
        .count();
    if missing_xfo > 0 {
        push_action(&mut actions, "set-subdomain-frame-options", Some(missing_xfo));
    }

    if let Some(root) = &result.root_security_headers {
        if !root.x_content_type_options.present {
            push_action(&mut actions, "add-root-content-type-options", None);
        }
        if !root.referrer_policy.present {
            push_action(&mut actions, "add-root-referrer-policy", None);
        }
        if !root.permissions_policy.present {
            push_action(&mut actions, "add-root-permissions-policy", None);
        }
    }

    actions.sort_by_key(|a| a.severity);
    actions
}

fn push_action(actions: &mut Vec<ActionItem>, id: &str, count: Option<usize>) {
    match action_detail(id) {
        Some(detail) => actions.push(ActionItem {
            id: detail.id.to_string(),
            severity: detail.severity,
            title: detail.title.to_string(),
            description: detail.description.to_string(),
            fix: detail.fix.to_string(),
            count,
        }),
        None => error!(id, "rule references an unknown catalog entry, skipping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{DnsInfo, HeaderCheck, SecurityHeadersResult, Severity};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn headers_with_score(score: u8, all_present: bool) -> SecurityHeadersResult {
        let check = |present| HeaderCheck {
            present,
            value: present.then(|| "x".to_string()),
        };
        SecurityHeadersResult {
            hsts: check(all_present),
            csp: check(all_present),
            x_frame_options: check(all_present),
            x_content_type_options: check(all_present),
            referrer_policy: check(all_present),
            permissions_policy: check(all_present),
            score,
        }
    }

    fn host(name: &str, ips: &[&str], has_cert: bool, cert_valid: bool) -> SubdomainInfo {
        SubdomainInfo {
            name: name.to_string(),
            ips: ips.iter().map(|s| s.to_string()).collect(),
            has_cert,
            cert_expiry: has_cert
                .then(|| Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()),
            cert_valid,
            security_headers: None,
            technologies: None,
        }
    }

    fn result_with(subdomains: Vec<SubdomainInfo>, root: Option<SecurityHeadersResult>) -> ScanResultData {
        ScanResultData {
            domain: "example.com".to_string(),
            subdomains,
            dns: DnsInfo::default(),
            scan_time: 100,
            scanned_at: Some(fixed_now()),
            root_security_headers: root,
            partial: false,
        }
    }

    #[test]
    fn grade_bands_are_exact_at_every_boundary() {
        let table = [
            (100, Grade::A),
            (90, Grade::A),
            (89, Grade::B),
            (80, Grade::B),
            (79, Grade::C),
            (60, Grade::C),
            (59, Grade::D),
            (40, Grade::D),
            (39, Grade::F),
            (0, Grade::F),
        ];
        for (score, expected) in table {
            assert_eq!(grade_for(score), expected, "score {score}");
        }
    }

    #[test]
    fn score_formula_is_exact() {
        // root 100, one subdomain at 50 -> 0.4*100 + 0.6*50 = 70,
        // minus one bad-cert host -> 58.
        let mut good = host("www.example.com", &["1.2.3.4"], true, true);
        good.security_headers = Some(headers_with_score(50, true));
        let bad = host("dev.example.com", &["1.2.3.5"], false, false);

        let result = result_with(vec![good, bad], Some(headers_with_score(100, true)));
        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 58);
        assert_eq!(assessment.grade, Grade::D);
    }

    #[test]
    fn hosts_without_header_data_are_excluded_from_the_mean() {
        let mut with_headers = host("www.example.com", &["1.2.3.4"], true, true);
        with_headers.security_headers = Some(headers_with_score(100, true));
        let without_headers = host("api.example.com", &["1.2.3.5"], true, true);

        // If the header-less host counted as zero the mean would be 50;
        // excluded, it stays 100.
        let result = result_with(vec![with_headers, without_headers], None);
        assert_eq!(assess_at(&result, fixed_now()).score, 100);
    }

    #[test]
    fn no_header_data_anywhere_scores_the_neutral_baseline() {
        let result = result_with(vec![host("www.example.com", &["1.2.3.4"], true, true)], None);
        assert_eq!(assess_at(&result, fixed_now()).score, 50);
    }

    #[test]
    fn invalidating_a_cert_never_raises_the_score() {
        let mut hosts = vec![
            host("www.example.com", &["1.2.3.4"], true, true),
            host("api.example.com", &["1.2.3.5"], true, true),
        ];
        hosts[0].security_headers = Some(headers_with_score(80, true));
        let before = assess_at(&result_with(hosts.clone(), None), fixed_now()).score;

        hosts[1].cert_valid = false;
        let after = assess_at(&result_with(hosts, None), fixed_now()).score;

        assert!(after <= before, "invalid cert raised score: {before} -> {after}");
        assert_eq!(before - after, 12);
    }

    #[test]
    fn unresolvable_hosts_draw_no_cert_penalty() {
        let result = result_with(
            vec![SubdomainInfo::unresolved("ghost.example.com".to_string())],
            Some(headers_with_score(100, true)),
        );
        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 100);
        assert!(
            !assessment
                .actions
                .iter()
                .any(|a| a.id == "renew-invalid-certificates")
        );
    }

    #[test]
    fn expiring_cert_draws_penalty_and_high_action() {
        let mut soon = host("www.example.com", &["1.2.3.4"], true, true);
        soon.cert_expiry = Some(fixed_now() + Duration::days(7));
        let result = result_with(vec![soon], Some(headers_with_score(100, true)));

        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 96);

        let action = assessment
            .actions
            .iter()
            .find(|a| a.id == "renew-expiring-certificates")
            .expect("expiring-cert action");
        assert_eq!(action.severity, Severity::High);
        assert_eq!(action.count, Some(1));
    }

    #[test]
    fn expired_cert_is_penalized_once_as_invalid() {
        // certValid=false with a past expiry must not also draw the
        // expiring-soon penalty.
        let mut expired = host("www.example.com", &["1.2.3.4"], true, false);
        expired.cert_expiry = Some(fixed_now() - Duration::days(3));
        let result = result_with(vec![expired], Some(headers_with_score(100, true)));

        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 88);
        assert!(
            !assessment
                .actions
                .iter()
                .any(|a| a.id == "renew-expiring-certificates")
        );
    }

    #[test]
    fn actions_sort_critical_first_with_stable_ties() {
        // Two rules match at different severities: missing root CSP (medium)
        // and a bad cert (critical). Critical must surface first.
        let bad = host("dev.example.com", &["1.2.3.5"], false, false);
        let mut root = headers_with_score(75, true);
        root.csp = HeaderCheck::default();
        let result = result_with(vec![bad], Some(root));

        let actions = assess_at(&result, fixed_now()).actions;
        assert!(actions.len() >= 2);
        assert_eq!(actions[0].severity, Severity::Critical);
        for pair in actions.windows(2) {
            assert!(pair[0].severity <= pair[1].severity, "severity order violated");
        }
    }

    #[test]
    fn aggregated_counts_cover_all_matching_hosts() {
        let mut a = host("a.example.com", &["1.1.1.1"], true, true);
        a.security_headers = Some(headers_with_score(0, false));
        let mut b = host("b.example.com", &["2.2.2.2"], true, true);
        b.security_headers = Some(headers_with_score(0, false));
        let result = result_with(vec![a, b], None);

        let actions = assess_at(&result, fixed_now()).actions;
        let hsts = actions.iter().find(|a| a.id == "enable-subdomain-hsts").unwrap();
        assert_eq!(hsts.count, Some(2));
        let xfo = actions
            .iter()
            .find(|a| a.id == "set-subdomain-frame-options")
            .unwrap();
        assert_eq!(xfo.count, Some(2));
    }

    #[test]
    fn clean_surface_emits_no_actions() {
        let mut clean = host("www.example.com", &["1.2.3.4"], true, true);
        clean.security_headers = Some(headers_with_score(100, true));
        let result = result_with(vec![clean], Some(headers_with_score(100, true)));

        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.grade, Grade::A);
        assert!(assessment.actions.is_empty());
    }

    #[test]
    fn end_to_end_scenario_two_hosts_one_dark() {
        // www resolves with a valid cert and every header; dev resolves but
        // serves nothing.
        let mut www = host("www.example.com", &["93.184.216.34"], true, true);
        www.security_headers = Some(headers_with_score(100, true));
        www.technologies = Some(vec!["Nginx".to_string()]);
        let dev = host("dev.example.com", &["93.184.216.35"], false, false);

        let result = result_with(vec![www, dev], Some(headers_with_score(100, true)));
        assert_eq!(result.subdomains.len(), 2);
        assert!(!result.subdomains[1].cert_valid);

        let assessment = assess_at(&result, fixed_now());
        let critical = assessment
            .actions
            .iter()
            .find(|a| a.severity == Severity::Critical)
            .expect("a critical action");
        assert!(critical.title.to_lowercase().contains("certificate"));
        assert_eq!(critical.count, Some(1));
        assert_eq!(assessment.actions[0].severity, Severity::Critical);
    }

    #[test]
    fn assessment_is_deterministic() {
        let mut www = host("www.example.com", &["1.2.3.4"], true, true);
        www.security_headers = Some(headers_with_score(40, false));
        let result = result_with(vec![www], Some(headers_with_score(55, false)));

        let first = assess_at(&result, fixed_now());
        let second = assess_at(&result, fixed_now());
        assert_eq!(first, second);
    }

    #[test]
    fn score_stays_within_bounds_under_many_penalties() {
        let hosts: Vec<SubdomainInfo> = (0..20)
            .map(|i| host(&format!("h{i}.example.com"), &["1.2.3.4"], false, false))
            .collect();
        let result = result_with(hosts, Some(headers_with_score(10, false)));
        let assessment = assess_at(&result, fixed_now());
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.grade, Grade::F);
    }
}
