// src/core/scanner/cors_scanner.rs

use std::time::Duration;

use reqwest::header::{HeaderMap, ORIGIN};
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{AnalysisFinding, CheckKind, CorsAssessment, Severity};
use crate::core::scanner::{Probe, header_text, http_client};
use crate::core::target::Target;

/// The foreign origin presented to the target.
pub const PROBE_ORIGIN: &str = "https://example.com";

const RISK_WILDCARD_CREDENTIALS: &str = "Wildcard allow-origin with credentials can expose user data";
const RISK_REFLECTED_ORIGIN: &str = "Arbitrary origins are reflected in allow-origin";

#[derive(Debug, Default)]
pub struct CorsProbe;

impl Probe for CorsProbe {
    type Output = CorsAssessment;

    fn kind(&self) -> CheckKind {
        CheckKind::Cors
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<CorsAssessment> {
        info!(url = target.base_url(), origin = PROBE_ORIGIN, "Starting CORS check.");
        let response = http_client(timeout)?
            .get(target.base_url())
            .header(ORIGIN, PROBE_ORIGIN)
            .send()
            .await?;
        let assessment = assess_cors(response.url().as_str(), response.headers());
        info!(risks = assessment.risks.len(), "CORS check finished.");
        Ok(assessment)
    }
}

/// Evaluates the CORS response headers returned for `PROBE_ORIGIN`.
pub fn assess_cors(url: &str, headers: &HeaderMap) -> CorsAssessment {
    let allow_origin = header_text(headers, "access-control-allow-origin");
    let allow_credentials = header_text(headers, "access-control-allow-credentials")
        .map(|value| value.trim().eq_ignore_ascii_case("true"));
    debug!(allow_origin = ?allow_origin, allow_credentials = ?allow_credentials, "CORS headers.");

    let mut risks = Vec::new();
    let mut analysis = Vec::new();
    let credentials = allow_credentials == Some(true);
    match allow_origin.as_deref().map(str::trim) {
        Some("*") if credentials => {
            risks.push(RISK_WILDCARD_CREDENTIALS.to_string());
            analysis.push(AnalysisFinding::new(Severity::Critical, "CORS_WILDCARD_CREDENTIALS"));
        }
        Some("*") => analysis.push(AnalysisFinding::new(Severity::Info, "CORS_WILDCARD")),
        Some(origin) if origin.eq_ignore_ascii_case(PROBE_ORIGIN) => {
            risks.push(RISK_REFLECTED_ORIGIN.to_string());
            let severity = if credentials { Severity::Critical } else { Severity::Warning };
            analysis.push(AnalysisFinding::new(severity, "CORS_ORIGIN_REFLECTED"));
        }
        _ => {}
    }

    let recommendation = allow_origin
        .is_none()
        .then(|| "Set strict CORS only if cross-origin is required".to_string());

    CorsAssessment {
        url: url.to_string(),
        allow_origin,
        allow_credentials,
        risks,
        recommendation,
        analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn cors_headers(origin: Option<&'static str>, credentials: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin {
            headers.insert("access-control-allow-origin", HeaderValue::from_static(origin));
        }
        if let Some(credentials) = credentials {
            headers.insert("access-control-allow-credentials", HeaderValue::from_static(credentials));
        }
        headers
    }

    #[test]
    fn no_cors_headers_is_not_a_risk() {
        let assessment = assess_cors("https://example.org/", &cors_headers(None, None));
        assert!(assessment.risks.is_empty());
        assert!(assessment.allow_credentials.is_none());
        assert!(assessment.recommendation.is_some());
    }

    #[test]
    fn wildcard_with_credentials_is_critical() {
        let assessment = assess_cors("https://example.org/", &cors_headers(Some("*"), Some("True")));
        assert_eq!(assessment.allow_credentials, Some(true));
        assert_eq!(assessment.risks, vec![RISK_WILDCARD_CREDENTIALS.to_string()]);
        assert_eq!(assessment.analysis[0].severity, Severity::Critical);
    }

    #[test]
    fn reflected_origin_is_flagged() {
        let assessment = assess_cors("https://example.org/", &cors_headers(Some(PROBE_ORIGIN), Some("false")));
        assert_eq!(assessment.allow_credentials, Some(false));
        assert_eq!(assessment.risks, vec![RISK_REFLECTED_ORIGIN.to_string()]);
        assert_eq!(assessment.analysis[0].code, "CORS_ORIGIN_REFLECTED");
        assert_eq!(assessment.analysis[0].severity, Severity::Warning);
        assert!(assessment.recommendation.is_none());
    }

    #[test]
    fn fixed_trusted_origin_is_fine() {
        let assessment = assess_cors(
            "https://example.org/",
            &cors_headers(Some("https://app.example.org"), Some("true")),
        );
        assert!(assessment.risks.is_empty());
        assert!(assessment.analysis.is_empty());
    }
}
