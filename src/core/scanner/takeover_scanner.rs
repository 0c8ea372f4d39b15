// src/core/scanner/takeover_scanner.rs

//! Dangling-record detection: each discovered subdomain is fetched over plain
//! HTTP and its page is matched against error pages of hosting vendors that
//! let anyone claim an unclaimed name.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::error::ProbeResult;
use crate::core::models::{AnalysisFinding, Severity, TakeoverAssessment, TakeoverFinding};
use crate::core::scanner::http_client;
use crate::core::scheduler::BoundedScheduler;

/// At most this many names are fetched per scan.
pub const MAX_TAKEOVER_CANDIDATES: usize = 200;

/// Only the start of each page is searched.
const BODY_SCAN_LIMIT: usize = 8_000;

/// Page fragment and the vendor it identifies.
const SIGNATURES: &[(&str, &str)] = &[
    ("There isn't a GitHub Pages site here.", "GitHub Pages"),
    ("NoSuchBucket", "AWS S3"),
    ("The specified bucket does not exist", "AWS S3"),
    ("NoSuchDomain", "Azure"),
    ("Heroku | No such app", "Heroku"),
    ("There's nothing here, yet.", "Fastly/Netlify"),
];

/// Checks a list of names rather than the scan target, so it does not
/// implement `Probe`; the orchestrator feeds it the subdomain results.
#[derive(Debug, Clone, Copy)]
pub struct TakeoverCheck {
    concurrency: usize,
}

impl TakeoverCheck {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    pub async fn assess(&self, subdomains: &[String], timeout: Duration) -> ProbeResult<TakeoverAssessment> {
        let candidates: Vec<String> = subdomains.iter().take(MAX_TAKEOVER_CANDIDATES).cloned().collect();
        info!(candidates = candidates.len(), "Starting takeover check.");
        let client = http_client(timeout)?;

        let results = BoundedScheduler::new(self.concurrency)
            .run(candidates.iter().cloned(), |subdomain| {
                let client = client.clone();
                async move {
                    let body = match fetch_page(&client, &subdomain).await {
                        Some(body) => body,
                        None => return None,
                    };
                    match_signature(&body).map(|vendor| TakeoverFinding {
                        reason: format!("Potential takeover signature: {vendor}"),
                        vendor: vendor.to_string(),
                        subdomain,
                    })
                }
            })
            .await;

        let flagged: Vec<TakeoverFinding> = results.into_iter().filter_map(|r| r.ok().flatten()).collect();
        let mut analysis = Vec::new();
        if !flagged.is_empty() {
            warn!(flagged = flagged.len(), "Takeover signatures found.");
            analysis.push(AnalysisFinding::new(Severity::Critical, "TAKEOVER_SIGNATURE"));
        }
        info!(checked = candidates.len(), flagged = flagged.len(), "Takeover check finished.");

        Ok(TakeoverAssessment { checked_count: candidates.len(), flagged, analysis })
    }
}

async fn fetch_page(client: &reqwest::Client, subdomain: &str) -> Option<String> {
    let url = format!("http://{subdomain}");
    match client.get(&url).send().await {
        Ok(response) => response.text().await.ok(),
        Err(e) => {
            debug!(url = %url, error = %e, "Takeover candidate unreachable.");
            None
        }
    }
}

/// The vendor whose error page appears in the first part of `body`, if any.
pub fn match_signature(body: &str) -> Option<&'static str> {
    let head = match body.char_indices().nth(BODY_SCAN_LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    };
    SIGNATURES
        .iter()
        .find(|(phrase, _)| head.contains(phrase))
        .map(|(_, vendor)| *vendor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_vendor_error_pages() {
        assert_eq!(
            match_signature("<h1>404</h1><p>There isn't a GitHub Pages site here.</p>"),
            Some("GitHub Pages")
        );
        assert_eq!(
            match_signature("<Error><Code>NoSuchBucket</Code></Error>"),
            Some("AWS S3")
        );
        assert_eq!(match_signature("<title>Welcome</title>"), None);
    }

    #[test]
    fn signature_past_the_scan_window_is_ignored() {
        let body = format!("{}NoSuchBucket", "a".repeat(BODY_SCAN_LIMIT));
        assert_eq!(match_signature(&body), None);
    }

    #[tokio::test]
    async fn vendor_page_is_flagged() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let body = "<p>There isn't a GitHub Pages site here.</p>";
            let response = format!(
                "HTTP/1.1 404 Not Found\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let names = vec![addr.to_string()];
        let assessment = TakeoverCheck::new(4).assess(&names, Duration::from_secs(2)).await.unwrap();
        assert_eq!(assessment.flagged.len(), 1);
        assert_eq!(assessment.flagged[0].vendor, "GitHub Pages");
        assert_eq!(assessment.flagged[0].subdomain, addr.to_string());
        assert_eq!(assessment.analysis[0].code, "TAKEOVER_SIGNATURE");
    }

    #[tokio::test]
    async fn unreachable_names_are_checked_but_not_flagged() {
        let names = vec!["127.0.0.1:1".to_string()];
        let assessment = TakeoverCheck::new(4).assess(&names, Duration::from_millis(500)).await.unwrap();
        assert_eq!(assessment.checked_count, 1);
        assert!(assessment.flagged.is_empty());
        assert!(assessment.analysis.is_empty());
    }

    #[tokio::test]
    async fn candidate_list_is_capped() {
        let names: Vec<String> = (0..MAX_TAKEOVER_CANDIDATES + 5).map(|i| format!("127.0.0.1:{}", 1 + i % 2)).collect();
        let assessment = TakeoverCheck::new(50).assess(&names, Duration::from_millis(300)).await.unwrap();
        assert_eq!(assessment.checked_count, MAX_TAKEOVER_CANDIDATES);
    }
}
