// src/core/scanner/fingerprint_scanner.rs

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::headers_scanner::HttpProbe;

/// Where a technology signature is looked for.
enum Check<'a> {
    /// A pattern in one named response header.
    Header(&'a str, &'a Lazy<Regex>),
    /// A pattern in the content of a named meta tag.
    MetaTag(&'a str, &'a Lazy<Regex>),
    /// A pattern anywhere in the response body.
    Body(&'a Lazy<Regex>),
    /// A pattern in the `src` of a script tag.
    ScriptSrc(&'a Lazy<Regex>),
    /// A pattern in the `href` of a link tag.
    LinkHref(&'a Lazy<Regex>),
    /// A pattern in the joined `set-cookie` values.
    Cookie(&'a Lazy<Regex>),
}

/// One detection rule: the label it emits and the check that fires it.
/// Capture group 1, when present and non-empty, is the version.
struct Signature<'a> {
    label: &'a str,
    check: Check<'a>,
}

static RE_NGINX: Lazy<Regex> = Lazy::new(|| Regex::new(r"nginx/([\d\.]+)").unwrap());
static RE_NGINX_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<hr><center>nginx</center>").unwrap());
static RE_APACHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Apache/([\d\.]+)").unwrap());
static RE_IIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Microsoft-IIS/([\d\.]+)").unwrap());
static RE_CLOUDFLARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"cloudflare").unwrap());
static RE_LITESPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"LiteSpeed").unwrap());
static RE_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress ([\d\.]+)").unwrap());
static RE_WP_PATHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/wp-content/|/wp-includes/").unwrap());
static RE_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Joomla!").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal ?([\d\.]*)").unwrap());
static RE_SHOPIFY: Lazy<Regex> = Lazy::new(|| Regex::new(r"shopify").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHP/([\d\.]+)").unwrap());
static RE_PHPSESSID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHPSESSID").unwrap());
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"ASP\.NET").unwrap());
static RE_EXPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Express").unwrap());
static RE_JSESSIONID: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSESSIONID").unwrap());
static RE_DJANGO_CSRF: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrftoken").unwrap());
static RE_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session").unwrap());
static RE_NEXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Next\.js ?([\d\.]*)").unwrap());
static RE_NEXTJS_ASSETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/_next/static/").unwrap());
static RE_NUXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUXT__").unwrap());
static RE_ANGULAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"ng-version="([\d\.]+)""#).unwrap());
static RE_REACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"react-dom|data-reactroot").unwrap());
static RE_VUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"data-v-app|__VUE_").unwrap());
static RE_JQUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"jquery(?:[-\.]([\d\.]+))?(?:\.min)?\.js").unwrap());
static RE_BOOTSTRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"bootstrap(?:\.min)?\.css").unwrap());
static RE_GOOGLE_ANALYTICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"google-analytics\.com/|googletagmanager\.com/").unwrap());

/// The signature table. Multiple rules may emit the same label; the first
/// captured version wins for that label.
static SIGNATURES: &[Signature] = &[
    Signature { label: "Nginx", check: Check::Header("server", &RE_NGINX) },
    Signature { label: "Nginx", check: Check::Body(&RE_NGINX_ERROR) },
    Signature { label: "Apache", check: Check::Header("server", &RE_APACHE) },
    Signature { label: "Microsoft IIS", check: Check::Header("server", &RE_IIS) },
    Signature { label: "Cloudflare", check: Check::Header("server", &RE_CLOUDFLARE) },
    Signature { label: "LiteSpeed", check: Check::Header("server", &RE_LITESPEED) },
    Signature { label: "WordPress", check: Check::MetaTag("generator", &RE_WORDPRESS) },
    Signature { label: "WordPress", check: Check::Body(&RE_WP_PATHS) },
    Signature { label: "Joomla", check: Check::MetaTag("generator", &RE_JOOMLA) },
    Signature { label: "Drupal", check: Check::Header("x-generator", &RE_DRUPAL) },
    Signature { label: "Shopify", check: Check::Header("x-shopid", &RE_SHOPIFY) },
    Signature { label: "PHP", check: Check::Header("x-powered-by", &RE_PHP) },
    Signature { label: "PHP", check: Check::Cookie(&RE_PHPSESSID) },
    Signature { label: "ASP.NET", check: Check::Header("x-powered-by", &RE_ASPNET) },
    Signature { label: "Express", check: Check::Header("x-powered-by", &RE_EXPRESS) },
    Signature { label: "Java", check: Check::Cookie(&RE_JSESSIONID) },
    Signature { label: "Django", check: Check::Cookie(&RE_DJANGO_CSRF) },
    Signature { label: "Ruby on Rails", check: Check::Cookie(&RE_RAILS) },
    Signature { label: "Next.js", check: Check::Header("x-powered-by", &RE_NEXTJS) },
    Signature { label: "Next.js", check: Check::ScriptSrc(&RE_NEXTJS_ASSETS) },
    Signature { label: "Nuxt.js", check: Check::Body(&RE_NUXT) },
    Signature { label: "Angular", check: Check::Body(&RE_ANGULAR) },
    Signature { label: "React", check: Check::Body(&RE_REACT) },
    Signature { label: "Vue.js", check: Check::Body(&RE_VUE) },
    Signature { label: "jQuery", check: Check::ScriptSrc(&RE_JQUERY) },
    Signature { label: "Bootstrap", check: Check::LinkHref(&RE_BOOTSTRAP) },
    Signature { label: "Google Analytics", check: Check::ScriptSrc(&RE_GOOGLE_ANALYTICS) },
];

/// Applies the signature table to an already-captured HTTP response.
///
/// Pure and synchronous: it issues no network traffic of its own, reusing
/// the header probe's response instead. Output is a deduplicated label
/// list in lexicographic order, versions appended when captured.
pub fn run_fingerprint_scan(probe: &HttpProbe) -> Vec<String> {
    let document = Html::parse_document(&probe.body);
    let mut found: BTreeMap<&str, Option<String>> = BTreeMap::new();

    for signature in SIGNATURES {
        let matched = match &signature.check {
            Check::Header(name, re) => {
                capture(probe.headers.get(*name).and_then(|v| v.to_str().ok()), re)
            }
            Check::MetaTag(name, re) => capture_meta(&document, name, re),
            Check::Body(re) => capture(Some(&probe.body), re),
            Check::ScriptSrc(re) => capture_attr(&document, "script[src]", "src", re),
            Check::LinkHref(re) => capture_attr(&document, "link[href]", "href", re),
            Check::Cookie(re) => capture(Some(&probe.cookies), re),
        };

        if let Some(version) = matched {
            debug!(label = signature.label, version = ?version, "signature matched");
            let entry = found.entry(signature.label).or_insert(None);
            if entry.is_none() && version.is_some() {
                *entry = version;
            }
        }
    }

    found
        .into_iter()
        .map(|(label, version)| match version {
            Some(v) => format!("{label} {v}"),
            None => label.to_string(),
        })
        .collect()
}

/// `Some(version)` when the pattern matches; the inner option is capture
/// group 1 when it captured something non-empty.
fn capture(text: Option<&str>, re: &Regex) -> Option<Option<String>> {
    text.and_then(|text| {
        re.captures(text).map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty())
        })
    })
}

fn capture_meta(document: &Html, name: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(&format!("meta[name='{name}']")).ok()?;
    let content = document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"));
    capture(content, re)
}

fn capture_attr(
    document: &Html,
    selector_str: &str,
    attr: &str,
    re: &Regex,
) -> Option<Option<String>> {
    let selector = Selector::parse(selector_str).ok()?;
    for element in document.select(&selector) {
        if let Some(value) = element.value().attr(attr) {
            if let Some(version) = capture(Some(value), re) {
                return Some(version);
            }
        }
    }
    None
}
