// src/core/models.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::core::target::Target;

// --- Shared Analysis Types ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// A single analysis finding. `code` is a key into the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self { severity, code: code.to_string() }
    }
}

/// Every check the orchestrator knows how to run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    Subdomains,
    Ports,
    Tls,
    Headers,
    Dns,
    Preview,
    Takeover,
    Cors,
    Cookies,
    Fingerprint,
    SecurityTxt,
    MixedContent,
    DnsExtras,
    Axfr,
}

// --- Probe Slots ---

/// The outcome recorded for one check in a `ScanReport`.
///
/// Anything other than `Completed` is an absent result. The variants keep apart
/// "switched off", "not applicable" and "ran but failed".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Slot<T> {
    Completed { result: T },
    Disabled,
    Skipped { reason: String },
    Failed { reason: String },
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        !matches!(self, Slot::Completed { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Slot::Completed { .. } => "completed",
            Slot::Disabled => "disabled",
            Slot::Skipped { .. } => "skipped",
            Slot::Failed { .. } => "failed",
        }
    }
}

// --- Port Scanner Models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortProbeOutcome {
    pub port: u16,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortScanReport {
    pub host: String,
    pub backend: String,
    pub ports_scanned: Vec<u16>,
    pub open_ports: Vec<u16>,
    pub outcomes: Vec<PortProbeOutcome>,
}

impl PortScanReport {
    /// Builds a report whose outcomes line up one-to-one with `candidates`.
    ///
    /// A candidate without a recorded outcome counts as closed, and outcomes for
    /// ports outside the candidate set are dropped.
    pub fn assemble(
        host: &str,
        backend: &str,
        candidates: &[u16],
        outcomes: impl IntoIterator<Item = PortProbeOutcome>,
    ) -> Self {
        let open: std::collections::BTreeSet<u16> = outcomes
            .into_iter()
            .filter(|o| o.is_open)
            .map(|o| o.port)
            .collect();

        let mut ports_scanned = candidates.to_vec();
        ports_scanned.sort_unstable();
        ports_scanned.dedup();

        let outcomes: Vec<PortProbeOutcome> = ports_scanned
            .iter()
            .map(|&port| PortProbeOutcome { port, is_open: open.contains(&port) })
            .collect();
        let open_ports = outcomes.iter().filter(|o| o.is_open).map(|o| o.port).collect();

        Self {
            host: host.to_string(),
            backend: backend.to_string(),
            ports_scanned,
            open_ports,
            outcomes,
        }
    }
}

// --- Subdomain Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubdomainReport {
    pub root_domain: String,
    pub discovered: Vec<String>,
    pub source_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeoverFinding {
    pub subdomain: String,
    pub vendor: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeoverAssessment {
    pub checked_count: usize,
    pub flagged: Vec<TakeoverFinding>,
    pub analysis: Vec<AnalysisFinding>,
}

// --- SSL/TLS Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsInfo {
    pub domain: String,
    pub port: u16,
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub subject_alternative_names: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

// --- HTTP Header Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderFinding {
    pub header: String,
    pub present: bool,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadersAssessment {
    pub url: String,
    pub findings: Vec<HeaderFinding>,
    pub grade: String,
    pub score: u8,
    pub analysis: Vec<AnalysisFinding>,
}

// --- DNS Models ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsAssessment {
    pub domain: String,
    pub a_records: Vec<String>,
    pub aaaa_records: Vec<String>,
    pub mx_records: Vec<String>,
    pub txt_records: Vec<String>,
    pub spf_present: bool,
    pub spf_policy: Option<String>,
    pub spf_recommendation: Option<String>,
    pub dmarc_present: bool,
    pub dmarc_policy: Option<String>,
    pub dmarc_recommendation: Option<String>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsExtras {
    pub domain: String,
    pub dnssec_present: bool,
    pub caa_records: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxfrCheck {
    pub domain: String,
    pub attempted_ns: Vec<String>,
    pub axfr_allowed_on: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

// --- Web Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPreview {
    pub url: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub server: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsAssessment {
    pub url: String,
    pub allow_origin: Option<String>,
    pub allow_credentials: Option<bool>,
    pub risks: Vec<String>,
    pub recommendation: Option<String>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieInfo {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieAssessment {
    pub url: String,
    pub cookies: Vec<CookieInfo>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFingerprint {
    pub url: String,
    pub server: Option<String>,
    pub waf_or_cdn: Option<String>,
    pub technologies: Vec<Technology>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityTxt {
    pub url: String,
    pub found: bool,
    pub contacts: Vec<String>,
    pub policy: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixedContentReport {
    pub url: String,
    pub insecure_reference_count: usize,
    pub examples: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

// --- Main Report ---

/// The aggregate result of one scan. Assembled once by the orchestrator and
/// handed to the caller by value.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: Target,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub subdomains: Slot<SubdomainReport>,
    pub ports: Slot<PortScanReport>,
    pub tls: Slot<TlsInfo>,
    pub headers: Slot<HeadersAssessment>,
    pub dns: Slot<DnsAssessment>,
    pub preview: Slot<WebPreview>,
    pub takeover: Slot<TakeoverAssessment>,
    pub cors: Slot<CorsAssessment>,
    pub cookies: Slot<CookieAssessment>,
    pub fingerprint: Slot<WebFingerprint>,
    pub security_txt: Slot<SecurityTxt>,
    pub mixed_content: Slot<MixedContentReport>,
    pub dns_extras: Slot<DnsExtras>,
    pub axfr: Slot<AxfrCheck>,
}

impl ScanReport {
    /// The status of every slot, in `CheckKind` order.
    pub fn slot_statuses(&self) -> Vec<(CheckKind, &'static str)> {
        vec![
            (CheckKind::Subdomains, self.subdomains.status()),
            (CheckKind::Ports, self.ports.status()),
            (CheckKind::Tls, self.tls.status()),
            (CheckKind::Headers, self.headers.status()),
            (CheckKind::Dns, self.dns.status()),
            (CheckKind::Preview, self.preview.status()),
            (CheckKind::Takeover, self.takeover.status()),
            (CheckKind::Cors, self.cors.status()),
            (CheckKind::Cookies, self.cookies.status()),
            (CheckKind::Fingerprint, self.fingerprint.status()),
            (CheckKind::SecurityTxt, self.security_txt.status()),
            (CheckKind::MixedContent, self.mixed_content.status()),
            (CheckKind::DnsExtras, self.dns_extras.status()),
            (CheckKind::Axfr, self.axfr.status()),
        ]
    }

    pub fn slot_status(&self, kind: CheckKind) -> &'static str {
        self.slot_statuses()
            .into_iter()
            .find_map(|(k, status)| (k == kind).then_some(status))
            .unwrap_or("disabled")
    }

    /// All analysis findings across completed slots.
    pub fn findings(&self) -> Vec<&AnalysisFinding> {
        let mut all: Vec<&AnalysisFinding> = Vec::new();
        if let Some(tls) = self.tls.value() {
            all.extend(&tls.analysis);
        }
        if let Some(headers) = self.headers.value() {
            all.extend(&headers.analysis);
        }
        if let Some(dns) = self.dns.value() {
            all.extend(&dns.analysis);
        }
        if let Some(extras) = self.dns_extras.value() {
            all.extend(&extras.analysis);
        }
        if let Some(axfr) = self.axfr.value() {
            all.extend(&axfr.analysis);
        }
        if let Some(cors) = self.cors.value() {
            all.extend(&cors.analysis);
        }
        if let Some(cookies) = self.cookies.value() {
            all.extend(&cookies.analysis);
        }
        if let Some(mixed) = self.mixed_content.value() {
            all.extend(&mixed.analysis);
        }
        if let Some(takeover) = self.takeover.value() {
            all.extend(&takeover.analysis);
        }
        all.sort_by_key(|f| f.severity);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_keeps_open_ports_as_a_subsequence_of_outcomes() {
        let outcomes = vec![
            PortProbeOutcome { port: 443, is_open: true },
            PortProbeOutcome { port: 22, is_open: false },
            PortProbeOutcome { port: 80, is_open: true },
            PortProbeOutcome { port: 9999, is_open: true },
        ];
        let report = PortScanReport::assemble("host", "connect", &[443, 80, 22, 80], outcomes);

        assert_eq!(report.ports_scanned, vec![22, 80, 443]);
        assert_eq!(report.open_ports, vec![80, 443]);
        assert_eq!(report.outcomes.len(), 3);
        for port in &report.open_ports {
            assert!(report.outcomes.iter().any(|o| o.port == *port && o.is_open));
        }
    }

    #[test]
    fn missing_outcomes_count_as_closed() {
        let report = PortScanReport::assemble("host", "connect", &[21, 22], Vec::new());
        assert!(report.open_ports.is_empty());
        assert!(report.outcomes.iter().all(|o| !o.is_open));
    }

    #[test]
    fn slots_serialize_with_a_status_tag() {
        let disabled: Slot<SecurityTxt> = Slot::Disabled;
        let failed: Slot<SecurityTxt> = Slot::Failed { reason: "timed out".to_string() };
        assert_eq!(serde_json::to_value(&disabled).unwrap(), serde_json::json!({"status": "disabled"}));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failed", "reason": "timed out"})
        );
        assert!(disabled.is_absent() && failed.is_absent());
    }
}
