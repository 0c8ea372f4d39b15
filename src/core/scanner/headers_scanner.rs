// src/core/scanner/headers_scanner.rs

use std::time::Duration;

use reqwest::header::HeaderMap;
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{AnalysisFinding, CheckKind, HeaderFinding, HeadersAssessment, Severity};
use crate::core::scanner::{Probe, header_text, http_client};
use crate::core::target::Target;

/// The graded headers, each with the recommendation shown when it is missing,
/// the finding code and its severity.
const SECURITY_HEADERS: &[(&str, &str, &str, Severity)] = &[
    (
        "content-security-policy",
        "Set a strict CSP to mitigate XSS (e.g., default-src 'self')",
        "HEADERS_CSP_MISSING",
        Severity::Warning,
    ),
    (
        "strict-transport-security",
        "Enable HSTS to enforce HTTPS (includeSubDomains; preload)",
        "HEADERS_HSTS_MISSING",
        Severity::Warning,
    ),
    (
        "x-content-type-options",
        "Set to nosniff to prevent MIME sniffing",
        "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
        Severity::Info,
    ),
    (
        "x-frame-options",
        "Set to DENY or SAMEORIGIN to mitigate clickjacking",
        "HEADERS_X_FRAME_OPTIONS_MISSING",
        Severity::Warning,
    ),
    (
        "referrer-policy",
        "Set to no-referrer or strict-origin-when-cross-origin",
        "HEADERS_REFERRER_POLICY_MISSING",
        Severity::Info,
    ),
    (
        "permissions-policy",
        "Restrict powerful browser features",
        "HEADERS_PERMISSIONS_POLICY_MISSING",
        Severity::Info,
    ),
];

const CSP_WEAK: &str = "Avoid wildcard or unsafe-inline in CSP for stricter policy";
const HSTS_WEAK: &str = "Consider includeSubDomains and preload for robust HSTS";

#[derive(Debug, Default)]
pub struct HeadersProbe;

impl Probe for HeadersProbe {
    type Output = HeadersAssessment;

    fn kind(&self) -> CheckKind {
        CheckKind::Headers
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<HeadersAssessment> {
        let url = target.base_url();
        info!(url, "Starting headers scan.");

        let response = http_client(timeout)?.get(url).send().await?;
        info!(status = %response.status(), "Received HTTP response for headers scan.");

        let findings = evaluate_security_headers(response.headers());
        let (grade, score) = grade_from_findings(&findings);
        let analysis = analyze_headers(&findings);
        info!(grade = %grade, score, findings = %analysis.len(), "Headers scan finished.");

        Ok(HeadersAssessment { url: url.to_string(), findings, grade, score, analysis })
    }
}

/// One finding per graded header, followed by quality findings for a present
/// but permissive CSP or HSTS.
pub fn evaluate_security_headers(headers: &HeaderMap) -> Vec<HeaderFinding> {
    let mut findings: Vec<HeaderFinding> = SECURITY_HEADERS
        .iter()
        .map(|(name, recommendation, _, _)| {
            let present = headers.contains_key(*name);
            debug!(header_name = name, present, "Checked header.");
            HeaderFinding {
                header: name.to_string(),
                present,
                recommendation: (!present).then(|| recommendation.to_string()),
            }
        })
        .collect();

    if let Some(csp) = header_text(headers, "content-security-policy") {
        if csp.contains("unsafe-inline") || csp.contains('*') {
            findings.push(quality_finding("content-security-policy", CSP_WEAK));
        }
    }
    if let Some(hsts) = header_text(headers, "strict-transport-security") {
        let hsts = hsts.to_ascii_lowercase();
        if hsts.contains("max-age") && !hsts.contains("includesubdomains") {
            findings.push(quality_finding("strict-transport-security", HSTS_WEAK));
        }
    }
    findings
}

fn quality_finding(header: &str, recommendation: &str) -> HeaderFinding {
    HeaderFinding {
        header: header.to_string(),
        present: true,
        recommendation: Some(recommendation.to_string()),
    }
}

/// Score is the share of graded headers present, minus five points per
/// recommendation, clamped to 0..=100.
pub fn grade_from_findings(findings: &[HeaderFinding]) -> (String, u8) {
    let present = findings.iter().filter(|f| f.present && f.recommendation.is_none()).count();
    let deductions = findings.iter().filter(|f| f.recommendation.is_some()).count();
    let share = (present * 100 / SECURITY_HEADERS.len()) as i64;
    let score = (share - deductions as i64 * 5).clamp(0, 100) as u8;

    let grade = match score {
        95..=u8::MAX => "A+",
        90..=94 => "A",
        80..=89 => "B",
        70..=79 => "C",
        60..=69 => "D",
        _ => "F",
    };
    (grade.to_string(), score)
}

fn analyze_headers(findings: &[HeaderFinding]) -> Vec<AnalysisFinding> {
    let mut analyses: Vec<AnalysisFinding> = SECURITY_HEADERS
        .iter()
        .filter(|(name, ..)| findings.iter().any(|f| f.header == *name && !f.present))
        .map(|(_, _, code, severity)| AnalysisFinding::new(*severity, code))
        .collect();

    for finding in findings.iter().filter(|f| f.present && f.recommendation.is_some()) {
        let code = match finding.header.as_str() {
            "content-security-policy" => "HEADERS_CSP_WEAK",
            _ => "HEADERS_HSTS_WEAK",
        };
        analyses.push(AnalysisFinding::new(Severity::Info, code));
    }
    analyses
}
