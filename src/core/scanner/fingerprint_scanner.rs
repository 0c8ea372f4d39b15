// src/core/scanner/fingerprint_scanner.rs

use std::collections::BTreeMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{CheckKind, Technology, WebFingerprint};
use crate::core::scanner::{Probe, header_text, http_client};
use crate::core::target::Target;

/// Header tokens that give away a WAF or CDN in front of the site. The first
/// vendor with a matching token wins.
const WAF_SIGNS: &[(&str, &[&str])] = &[
    ("cloudflare", &["cloudflare", "__cf_bm", "cf-ray"]),
    ("akamai", &["akamai", "aka-cache", "akamai-ghost"]),
    ("fastly", &["fastly", "x-served-by"]),
    ("sucuri", &["sucuri", "x-sucuri-id"]),
    ("aws-cloudfront", &["cloudfront", "x-amz-cf-id"]),
];

/// Where a rule looks for its pattern.
enum Check<'a> {
    Header(&'a str, &'a Lazy<Regex>),
    MetaTag(&'a str, &'a Lazy<Regex>),
    Body(&'a Lazy<Regex>),
    ScriptSrc(&'a Lazy<Regex>),
    LinkHref(&'a Lazy<Regex>),
    Cookie(&'a Lazy<Regex>),
}

struct FingerprintRule<'a> {
    tech_name: &'a str,
    category: &'a str,
    check: Check<'a>,
}

// A first capture group, when present, is the version.
static RE_NGINX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)nginx(?:/([\d\.]+))?").unwrap());
static RE_APACHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Apache(?:/([\d\.]+))?").unwrap());
static RE_IIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Microsoft-IIS/([\d\.]+)").unwrap());
static RE_LITESPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"LiteSpeed").unwrap());
static RE_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress ?([\d\.]+)?").unwrap());
static RE_WP_EMBED: Lazy<Regex> = Lazy::new(|| Regex::new(r"/wp-content/|/wp-includes/").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal ?([\d\.]+)?").unwrap());
static RE_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Joomla!").unwrap());
static RE_SHOPIFY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)shopify").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHP(?:/([\d\.]+))?").unwrap());
static RE_PHPSESSID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHPSESSID").unwrap());
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"ASP\.NET").unwrap());
static RE_EXPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Express").unwrap());
static RE_JSESSIONID: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSESSIONID").unwrap());
static RE_DJANGO_CSRF: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrftoken").unwrap());
static RE_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session|_session_id").unwrap());
static RE_NEXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Next\.js ?([\d\.]+)?").unwrap());
static RE_NEXTJS_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/_next/static/").unwrap());
static RE_NUXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUXT__").unwrap());
static RE_ANGULAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"ng-version="([\d\.]+)""#).unwrap());
static RE_GATSBY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"id=["']___gatsby["']"#).unwrap());
static RE_JQUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"jquery(?:-|\.min\.js\?v=|/)?([\d]+\.[\d\.]+)?").unwrap());
static RE_REACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"react-dom|data-reactroot|react\.development").unwrap());
static RE_VUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"data-v-app|__VUE_").unwrap());
static RE_BOOTSTRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"bootstrap(?:\.min)?\.css").unwrap());
static RE_GOOGLE_ANALYTICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"google-analytics\.com/|googletagmanager\.com/").unwrap());

static RULES: &[FingerprintRule] = &[
    FingerprintRule { tech_name: "Nginx", category: "Web Server", check: Check::Header("server", &RE_NGINX) },
    FingerprintRule { tech_name: "Apache", category: "Web Server", check: Check::Header("server", &RE_APACHE) },
    FingerprintRule { tech_name: "IIS", category: "Web Server", check: Check::Header("server", &RE_IIS) },
    FingerprintRule { tech_name: "LiteSpeed", category: "Web Server", check: Check::Header("server", &RE_LITESPEED) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", check: Check::MetaTag("generator", &RE_WORDPRESS) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", check: Check::Body(&RE_WP_EMBED) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::MetaTag("generator", &RE_DRUPAL) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::Header("x-generator", &RE_DRUPAL) },
    FingerprintRule { tech_name: "Joomla", category: "CMS", check: Check::MetaTag("generator", &RE_JOOMLA) },
    FingerprintRule { tech_name: "Shopify", category: "E-commerce", check: Check::Header("x-shopid", &RE_SHOPIFY) },
    FingerprintRule { tech_name: "Shopify", category: "E-commerce", check: Check::ScriptSrc(&RE_SHOPIFY) },
    FingerprintRule { tech_name: "PHP", category: "Language", check: Check::Header("x-powered-by", &RE_PHP) },
    FingerprintRule { tech_name: "PHP", category: "Language", check: Check::Cookie(&RE_PHPSESSID) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", check: Check::Header("x-powered-by", &RE_ASPNET) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", check: Check::Header("x-aspnet-version", &RE_ASPNET) },
    FingerprintRule { tech_name: "Express", category: "Framework", check: Check::Header("x-powered-by", &RE_EXPRESS) },
    FingerprintRule { tech_name: "Java", category: "Language", check: Check::Cookie(&RE_JSESSIONID) },
    FingerprintRule { tech_name: "Django", category: "Framework", check: Check::Cookie(&RE_DJANGO_CSRF) },
    FingerprintRule { tech_name: "Ruby on Rails", category: "Framework", check: Check::Cookie(&RE_RAILS) },
    FingerprintRule { tech_name: "Next.js", category: "JS Framework", check: Check::Header("x-powered-by", &RE_NEXTJS) },
    FingerprintRule { tech_name: "Next.js", category: "JS Framework", check: Check::ScriptSrc(&RE_NEXTJS_SCRIPT) },
    FingerprintRule { tech_name: "Nuxt.js", category: "JS Framework", check: Check::Body(&RE_NUXTJS) },
    FingerprintRule { tech_name: "Angular", category: "JS Framework", check: Check::Body(&RE_ANGULAR) },
    FingerprintRule { tech_name: "Gatsby", category: "JS Framework", check: Check::Body(&RE_GATSBY) },
    FingerprintRule { tech_name: "React", category: "JS Library", check: Check::Body(&RE_REACT) },
    FingerprintRule { tech_name: "Vue.js", category: "JS Library", check: Check::Body(&RE_VUE) },
    FingerprintRule { tech_name: "jQuery", category: "JS Library", check: Check::ScriptSrc(&RE_JQUERY) },
    FingerprintRule { tech_name: "Bootstrap", category: "UI Framework", check: Check::LinkHref(&RE_BOOTSTRAP) },
    FingerprintRule { tech_name: "Google Analytics", category: "Analytics", check: Check::ScriptSrc(&RE_GOOGLE_ANALYTICS) },
];

/// Server banner, WAF/CDN vendor and technology stack of the landing page.
#[derive(Debug, Default)]
pub struct FingerprintProbe;

impl Probe for FingerprintProbe {
    type Output = WebFingerprint;

    fn kind(&self) -> CheckKind {
        CheckKind::Fingerprint
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<WebFingerprint> {
        info!(url = target.base_url(), "Starting fingerprint scan.");
        let response = http_client(timeout)?.get(target.base_url()).send().await?;
        info!(status = %response.status(), "Received HTTP response.");

        // The final URL reflects redirects and scheme changes.
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(bytes = %body.len(), "Read response body.");

        let fingerprint = fingerprint_response(&url, &headers, &body);
        info!(count = %fingerprint.technologies.len(), waf = ?fingerprint.waf_or_cdn, "Fingerprint scan finished.");
        Ok(fingerprint)
    }
}

/// Applies the WAF signs and the rule table to one response.
pub fn fingerprint_response(url: &str, headers: &HeaderMap, body: &str) -> WebFingerprint {
    WebFingerprint {
        url: url.to_string(),
        server: header_text(headers, "server"),
        waf_or_cdn: detect_waf(headers).map(str::to_string),
        technologies: detect_technologies(headers, body),
    }
}

pub fn detect_waf(headers: &HeaderMap) -> Option<&'static str> {
    let header_blob = headers
        .iter()
        .map(|(name, value)| format!("{}:{}", name, String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    WAF_SIGNS
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|token| header_blob.contains(token)))
        .map(|(vendor, _)| *vendor)
}

fn detect_technologies(headers: &HeaderMap, body: &str) -> Vec<Technology> {
    let cookies = headers
        .get_all("set-cookie")
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let document = Html::parse_document(body);
    let mut found_techs: BTreeMap<&str, Technology> = BTreeMap::new();

    debug!(total_rules = %RULES.len(), "Applying fingerprinting rules.");
    for rule in RULES {
        let version = match &rule.check {
            Check::Header(name, re) => check_with_regex(headers.get(*name).and_then(|v| v.to_str().ok()), re),
            Check::MetaTag(name, re) => check_meta_tag(&document, name, re),
            Check::Body(re) => check_with_regex(Some(body), re),
            Check::ScriptSrc(re) => check_attribute(&document, "script[src]", "src", re),
            Check::LinkHref(re) => check_attribute(&document, "link[href]", "href", re),
            Check::Cookie(re) => check_with_regex(Some(&cookies), re),
        };

        let Some(version) = version else { continue };
        debug!(tech = %rule.tech_name, version = ?version, "Rule matched.");
        found_techs
            .entry(rule.tech_name)
            .and_modify(|existing| {
                if existing.version.is_none() {
                    existing.version = version.clone();
                }
            })
            .or_insert_with(|| Technology {
                name: rule.tech_name.to_string(),
                category: rule.category.to_string(),
                version,
            });
    }
    found_techs.into_values().collect()
}

/// `None` when the pattern does not match; `Some(version)` otherwise, where the
/// version is the first non-empty capture group.
fn check_with_regex(text: Option<&str>, re: &Regex) -> Option<Option<String>> {
    text.and_then(|text| {
        re.captures(text).map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().trim_end_matches('.').to_string())
                .filter(|s| !s.is_empty())
        })
    })
}

fn check_meta_tag(doc: &Html, name: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(&format!("meta[name='{name}']")).ok()?;
    let content = doc.select(&selector).next().and_then(|el| el.value().attr("content"));
    check_with_regex(content, re)
}

/// First element matching `selector` whose `attr` matches the pattern.
fn check_attribute(doc: &Html, selector: &str, attr: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(|value| check_with_regex(Some(value), re))
}
