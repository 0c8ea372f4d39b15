// src/core/scanner/security_txt_scanner.rs

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{CheckKind, SecurityTxt};
use crate::core::scanner::{Probe, http_client};
use crate::core::target::Target;

/// Locations tried in order. The first one answering 200 with a body wins.
const LOCATIONS: &[&str] = &["/.well-known/security.txt", "/security.txt"];

#[derive(Debug, Default)]
pub struct SecurityTxtProbe;

impl Probe for SecurityTxtProbe {
    type Output = SecurityTxt;

    fn kind(&self) -> CheckKind {
        CheckKind::SecurityTxt
    }

    /// Fails only when no location could be fetched at all; a server that
    /// answers without the file is a negative result.
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<SecurityTxt> {
        info!(target = target.host(), "Looking for security.txt.");
        let client = http_client(timeout)?;
        let mut last_error: Option<ProbeError> = None;
        let mut answered = false;

        for location in LOCATIONS {
            let url = target.url_for(location);
            match client.get(&url).send().await {
                Ok(response) => {
                    answered = true;
                    if response.status() != StatusCode::OK {
                        debug!(url = %url, status = %response.status(), "security.txt not served here.");
                        continue;
                    }
                    let text = response.text().await?;
                    if text.trim().is_empty() {
                        continue;
                    }
                    info!(url = %url, "Found security.txt.");
                    return Ok(parse_security_txt(&url, &text));
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "security.txt request failed.");
                    last_error = Some(e.into());
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(SecurityTxt {
                url: target.url_for(LOCATIONS[0]),
                found: false,
                contacts: Vec::new(),
                policy: None,
                expires: None,
            }),
        }
    }
}

/// Reads the `Contact`, `Policy` and `Expires` fields. Field names are
/// case-insensitive; comments and unknown fields are ignored.
pub fn parse_security_txt(url: &str, text: &str) -> SecurityTxt {
    let mut contacts = Vec::new();
    let mut policy = None;
    let mut expires = None;

    for line in text.lines().map(str::trim).filter(|l| !l.starts_with('#')) {
        let Some((field, value)) = line.split_once(':') else { continue };
        let value = value.trim().to_string();
        match field.trim().to_ascii_lowercase().as_str() {
            "contact" => contacts.push(value),
            "policy" => policy = Some(value),
            "expires" => expires = Some(value),
            _ => {}
        }
    }

    SecurityTxt { url: url.to_string(), found: true, contacts, policy, expires }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_fields() {
        let text = "# Our policy\nContact: mailto:security@example.com\ncontact: https://example.com/report\n\
                    Expires: 2026-12-31T23:00:00.000Z\nPolicy: https://example.com/disclosure\n\
                    Preferred-Languages: en\n";
        let parsed = parse_security_txt("https://example.com/.well-known/security.txt", text);
        assert!(parsed.found);
        assert_eq!(parsed.contacts, vec!["mailto:security@example.com", "https://example.com/report"]);
        assert_eq!(parsed.policy.as_deref(), Some("https://example.com/disclosure"));
        assert_eq!(parsed.expires.as_deref(), Some("2026-12-31T23:00:00.000Z"));
    }

    #[test]
    fn unrelated_text_yields_no_fields() {
        let parsed = parse_security_txt("https://example.com/security.txt", "<html>not found</html>");
        assert!(parsed.contacts.is_empty());
        assert!(parsed.policy.is_none() && parsed.expires.is_none());
    }
}
