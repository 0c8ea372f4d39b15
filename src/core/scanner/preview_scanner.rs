// src/core/scanner/preview_scanner.rs

use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{CheckKind, WebPreview};
use crate::core::scanner::{Probe, header_text, http_client};
use crate::core::target::Target;

/// Only the head of the page is searched for a title.
const PREVIEW_BODY_LIMIT: usize = 10_000;

#[derive(Debug, Default)]
pub struct PreviewProbe;

impl Probe for PreviewProbe {
    type Output = WebPreview;

    fn kind(&self) -> CheckKind {
        CheckKind::Preview
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<WebPreview> {
        let url = target.base_url();
        info!(url, "Starting web preview.");
        let response = http_client(timeout)?.get(url).send().await?;

        let status_code = response.status().as_u16();
        let server = header_text(response.headers(), "server");
        let content_type = header_text(response.headers(), "content-type");
        let body = response.text().await?;
        let title = extract_title(head_of(&body, PREVIEW_BODY_LIMIT));
        debug!(status_code, title = ?title, "Web preview finished.");

        Ok(WebPreview { url: url.to_string(), status_code, title, server, content_type })
    }
}

/// The text of the first `<title>`, whitespace-collapsed. Empty titles are `None`.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

/// At most `limit` bytes of `text`, cut on a character boundary.
fn head_of(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_collapses_title() {
        let html = "<html><head><TITLE>\n  Example   Domain \n</TITLE></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Example Domain"));
    }

    #[test]
    fn missing_or_blank_title_is_none() {
        assert_eq!(extract_title("<html><body>No title here</body></html>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
    }

    #[test]
    fn head_of_respects_char_boundaries() {
        let text = "ééé";
        assert_eq!(head_of(text, 3), "é");
        assert_eq!(head_of(text, 100), text);
    }
}
