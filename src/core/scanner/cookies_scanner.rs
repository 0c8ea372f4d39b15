// src/core/scanner/cookies_scanner.rs

use std::time::Duration;

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{AnalysisFinding, CheckKind, CookieAssessment, CookieInfo, Severity};
use crate::core::scanner::{Probe, http_client};
use crate::core::target::Target;

const MISSING_SECURE: &str = "Missing Secure";
const MISSING_HTTP_ONLY: &str = "Missing HttpOnly";
const MISSING_SAME_SITE: &str = "Missing SameSite";

#[derive(Debug, Default)]
pub struct CookiesProbe;

impl Probe for CookiesProbe {
    type Output = CookieAssessment;

    fn kind(&self) -> CheckKind {
        CheckKind::Cookies
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<CookieAssessment> {
        let url = target.base_url();
        info!(url, "Starting cookie check.");
        let response = http_client(timeout)?.get(url).send().await?;
        let assessment = assess_cookies(url, response.headers());
        info!(cookies = assessment.cookies.len(), findings = assessment.analysis.len(), "Cookie check finished.");
        Ok(assessment)
    }
}

/// Parses every `Set-Cookie` header of a response. One finding per missing
/// attribute kind, however many cookies lack it.
pub fn assess_cookies(url: &str, headers: &HeaderMap) -> CookieAssessment {
    let cookies: Vec<CookieInfo> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| parse_set_cookie(&String::from_utf8_lossy(value.as_bytes())))
        .collect();

    let mut analysis = Vec::new();
    for (issue, severity, code) in [
        (MISSING_SECURE, Severity::Warning, "COOKIE_MISSING_SECURE"),
        (MISSING_HTTP_ONLY, Severity::Warning, "COOKIE_MISSING_HTTPONLY"),
        (MISSING_SAME_SITE, Severity::Info, "COOKIE_MISSING_SAMESITE"),
    ] {
        if cookies.iter().any(|cookie| cookie.issues.iter().any(|i| i == issue)) {
            analysis.push(AnalysisFinding::new(severity, code));
        }
    }

    CookieAssessment { url: url.to_string(), cookies, analysis }
}

/// Reads the name and the security attributes of one `Set-Cookie` value.
/// A header without a cookie name yields `None`.
pub fn parse_set_cookie(header_value: &str) -> Option<CookieInfo> {
    let mut parts = header_value.split(';').map(str::trim);
    let name = parts.next()?.split('=').next()?.trim();
    if name.is_empty() {
        return None;
    }

    let mut secure = false;
    let mut http_only = false;
    let mut same_site = None;
    for attribute in parts {
        let (key, value) = match attribute.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (attribute, None),
        };
        match key.to_ascii_lowercase().as_str() {
            "secure" => secure = true,
            "httponly" => http_only = true,
            "samesite" => same_site = value.filter(|v| !v.is_empty()).map(str::to_string),
            _ => {}
        }
    }

    let mut issues = Vec::new();
    if !secure {
        issues.push(MISSING_SECURE.to_string());
    }
    if !http_only {
        issues.push(MISSING_HTTP_ONLY.to_string());
    }
    if same_site.is_none() {
        issues.push(MISSING_SAME_SITE.to_string());
    }
    debug!(cookie = name, issues = issues.len(), "Parsed cookie.");

    Some(CookieInfo { name: name.to_string(), secure, http_only, same_site, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn hardened_cookie_has_no_issues() {
        let cookie = parse_set_cookie("session=abc123; Path=/; Secure; HttpOnly; SameSite=Strict").unwrap();
        assert_eq!(cookie.name, "session");
        assert!(cookie.secure && cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Strict"));
        assert!(cookie.issues.is_empty());
    }

    #[test]
    fn bare_cookie_lists_every_issue() {
        let cookie = parse_set_cookie("tracking=1; Path=/").unwrap();
        assert_eq!(cookie.issues, vec![MISSING_SECURE, MISSING_HTTP_ONLY, MISSING_SAME_SITE]);
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let cookie = parse_set_cookie("id=7; secure; HTTPONLY; samesite=lax").unwrap();
        assert!(cookie.secure && cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("lax"));
    }

    #[test]
    fn nameless_header_is_skipped() {
        assert!(parse_set_cookie("=value; Secure").is_none());
        assert!(parse_set_cookie("").is_none());
    }

    #[test]
    fn findings_are_aggregated_per_issue() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Secure; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2; Secure; HttpOnly"));
        let assessment = assess_cookies("https://example.com", &headers);

        assert_eq!(assessment.cookies.len(), 2);
        let codes: Vec<&str> = assessment.analysis.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["COOKIE_MISSING_SAMESITE"]);
    }
}
