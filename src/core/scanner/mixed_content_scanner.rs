// src/core/scanner/mixed_content_scanner.rs

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::core::error::ProbeResult;
use crate::core::models::{AnalysisFinding, CheckKind, MixedContentReport, Severity};
use crate::core::scanner::{Probe, http_client};
use crate::core::target::Target;

const MAX_EXAMPLES: usize = 10;

static RE_INSECURE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)http://[^\s'"<>]+"#).unwrap());

#[derive(Debug, Default)]
pub struct MixedContentProbe;

impl Probe for MixedContentProbe {
    type Output = MixedContentReport;

    fn kind(&self) -> CheckKind {
        CheckKind::MixedContent
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<MixedContentReport> {
        let url = target.base_url();
        info!(url, "Starting mixed content check.");
        let body = http_client(timeout)?.get(url).send().await?.text().await?;
        let report = scan_mixed_content(url, &body);
        info!(count = report.insecure_reference_count, "Mixed content check finished.");
        Ok(report)
    }
}

/// Counts plain `http://` references in a page and keeps the first few unique
/// ones as examples.
pub fn scan_mixed_content(url: &str, body: &str) -> MixedContentReport {
    let mut count = 0;
    let mut examples: Vec<String> = Vec::new();
    for reference in RE_INSECURE_REFERENCE.find_iter(body).map(|m| m.as_str()) {
        count += 1;
        if examples.len() < MAX_EXAMPLES && !examples.iter().any(|e| e == reference) {
            examples.push(reference.to_string());
        }
    }

    let mut analysis = Vec::new();
    if count > 0 {
        analysis.push(AnalysisFinding::new(Severity::Warning, "MIXED_CONTENT"));
    }
    MixedContentReport { url: url.to_string(), insecure_reference_count: count, examples, analysis }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_reference_and_dedups_examples() {
        let body = r#"<img src="http://cdn.example.com/a.png"><img src='http://cdn.example.com/a.png'>
                      <script src="HTTP://legacy.example.com/app.js"></script>
                      <a href="https://example.com/safe">safe</a>"#;
        let report = scan_mixed_content("https://example.com", body);
        assert_eq!(report.insecure_reference_count, 3);
        assert_eq!(
            report.examples,
            vec!["http://cdn.example.com/a.png", "HTTP://legacy.example.com/app.js"]
        );
        assert_eq!(report.analysis.len(), 1);
    }

    #[test]
    fn examples_are_capped() {
        let body: String = (0..25).map(|i| format!("<img src=\"http://img{i}.example.com/x.png\">")).collect();
        let report = scan_mixed_content("https://example.com", &body);
        assert_eq!(report.insecure_reference_count, 25);
        assert_eq!(report.examples.len(), MAX_EXAMPLES);
    }

    #[test]
    fn clean_page_has_no_findings() {
        let report = scan_mixed_content("https://example.com", "<a href=\"https://example.com\">ok</a>");
        assert_eq!(report.insecure_reference_count, 0);
        assert!(report.examples.is_empty() && report.analysis.is_empty());
    }
}
