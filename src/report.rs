// src/report.rs

//! Renderings of a finished `ScanReport`: the console summary, JSON and a
//! standalone HTML page.

use std::fmt::Write as _;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::info;

use crate::core::knowledge_base::get_finding_detail;
use crate::core::models::{AnalysisFinding, CheckKind, ScanReport, Severity, Slot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub score: u8,
    pub critical_issues: usize,
    pub warning_issues: usize,
}

impl ScanSummary {
    /// 100 minus 15 per critical and 5 per warning finding, floored at 0.
    pub fn from_findings(findings: &[&AnalysisFinding]) -> Self {
        let criticals = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let warnings = findings.iter().filter(|f| f.severity == Severity::Warning).count();
        let penalty = criticals.saturating_mul(15).saturating_add(warnings.saturating_mul(5));
        Self {
            score: 100usize.saturating_sub(penalty) as u8,
            critical_issues: criticals,
            warning_issues: warnings,
        }
    }

    pub fn of(report: &ScanReport) -> Self {
        Self::from_findings(&report.findings())
    }

    pub fn rating(&self) -> &'static str {
        match self.score {
            90..=100 => "Excellent",
            75..=89 => "Good",
            50..=74 => "Needs Improvement",
            _ => "Poor",
        }
    }
}

pub fn to_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).wrap_err("failed to serialize the scan report")
}

pub fn write_json(report: &ScanReport, path: &Path) -> Result<()> {
    write_artifact(path, &to_json(report)?)?;
    info!(path = %path.display(), "JSON report written.");
    Ok(())
}

pub fn write_html(report: &ScanReport, path: &Path) -> Result<()> {
    write_artifact(path, &render_html(report))?;
    info!(path = %path.display(), "HTML report written.");
    Ok(())
}

/// One check's slot as pretty JSON, the output of the single-check commands.
pub fn slot_to_json(report: &ScanReport, kind: CheckKind) -> Result<String> {
    fn pretty<T: Serialize>(slot: &Slot<T>) -> serde_json::Result<String> {
        serde_json::to_string_pretty(slot)
    }
    let json = match kind {
        CheckKind::Subdomains => pretty(&report.subdomains),
        CheckKind::Ports => pretty(&report.ports),
        CheckKind::Tls => pretty(&report.tls),
        CheckKind::Headers => pretty(&report.headers),
        CheckKind::Dns => pretty(&report.dns),
        CheckKind::Preview => pretty(&report.preview),
        CheckKind::Takeover => pretty(&report.takeover),
        CheckKind::Cors => pretty(&report.cors),
        CheckKind::Cookies => pretty(&report.cookies),
        CheckKind::Fingerprint => pretty(&report.fingerprint),
        CheckKind::SecurityTxt => pretty(&report.security_txt),
        CheckKind::MixedContent => pretty(&report.mixed_content),
        CheckKind::DnsExtras => pretty(&report.dns_extras),
        CheckKind::Axfr => pretty(&report.axfr),
    };
    json.wrap_err_with(|| format!("failed to serialize the {kind} result"))
}

pub fn write_slot_json(report: &ScanReport, kind: CheckKind, path: &Path) -> Result<()> {
    write_artifact(path, &slot_to_json(report, kind)?)?;
    info!(check = %kind, path = %path.display(), "Check result written.");
    Ok(())
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).wrap_err_with(|| format!("failed to write {}", path.display()))
}

/// Plain-text summary printed by the CLI after a domain scan.
pub fn render_console(report: &ScanReport) -> String {
    let summary = ScanSummary::of(report);
    let mut out = String::new();
    let _ = writeln!(out, "SentinelScope report for {}", report.target.host());
    let _ = writeln!(
        out,
        "Overall score: {}/100 ({}), {} critical, {} warnings",
        summary.score,
        summary.rating(),
        summary.critical_issues,
        summary.warning_issues
    );
    let _ = writeln!(out, "Duration: {} ms", (report.finished_at - report.started_at).num_milliseconds());
    let _ = writeln!(out);

    let _ = writeln!(out, "Checks:");
    for (kind, status) in report.slot_statuses() {
        let _ = writeln!(out, "  {:<14} {}", kind.to_string(), status);
    }

    if let Some(ports) = report.ports.value() {
        let open: Vec<String> = ports.open_ports.iter().map(u16::to_string).collect();
        let _ = writeln!(
            out,
            "\nOpen ports ({} of {} scanned, {} backend): {}",
            open.len(),
            ports.ports_scanned.len(),
            ports.backend,
            if open.is_empty() { "none".to_string() } else { open.join(", ") }
        );
    }
    if let Some(subdomains) = report.subdomains.value() {
        let _ = writeln!(out, "\nSubdomains: {}", subdomains.discovered.len());
        for (source, count) in &subdomains.source_counts {
            let _ = writeln!(out, "  {source}: {count}");
        }
    }
    if let Some(headers) = report.headers.value() {
        let _ = writeln!(out, "\nHeaders grade: {} ({}/100)", headers.grade, headers.score);
    }

    let findings = report.findings();
    if !findings.is_empty() {
        let _ = writeln!(out, "\nFindings:");
        for finding in findings {
            match get_finding_detail(&finding.code) {
                Some(detail) => {
                    let _ = writeln!(out, "  [{:?}] {} ({})", finding.severity, detail.title, detail.category);
                    let _ = writeln!(out, "      {}", detail.remediation);
                }
                None => {
                    let _ = writeln!(out, "  [{:?}] {}", finding.severity, finding.code);
                }
            }
        }
    }
    out
}

/// Renders a self-contained HTML page. Every value taken from the report is
/// escaped.
pub fn render_html(report: &ScanReport) -> String {
    let summary = ScanSummary::of(report);
    let host = html_escape(report.target.host());
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>SentinelScope report: {host}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
table {{ border-collapse: collapse; margin-bottom: 1.5rem; }}
td, th {{ border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: left; }}
.critical {{ color: #b00020; }} .warning {{ color: #b26a00; }} .info {{ color: #1565c0; }}
.absent {{ color: #888; }}
</style>
</head>
<body>
<h1>SentinelScope report: {host}</h1>
<p>Base URL: {base_url}<br>Started: {started}<br>Finished: {finished}</p>
<h2>Score: {score}/100 ({rating})</h2>
<p>{critical} critical, {warning} warnings</p>
"#,
        base_url = html_escape(report.target.base_url()),
        started = report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        finished = report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        score = summary.score,
        rating = summary.rating(),
        critical = summary.critical_issues,
        warning = summary.warning_issues,
    );

    html.push_str("<h2>Checks</h2>\n<table>\n<tr><th>Check</th><th>Status</th><th>Detail</th></tr>\n");
    for (kind, status) in report.slot_statuses() {
        let detail = slot_reason(report, kind).map(html_escape).unwrap_or_default();
        let class = if status == "completed" { "" } else { " class=\"absent\"" };
        let _ = writeln!(html, "<tr{class}><td>{kind}</td><td>{status}</td><td>{detail}</td></tr>");
    }
    html.push_str("</table>\n");

    let findings = report.findings();
    if !findings.is_empty() {
        html.push_str("<h2>Findings</h2>\n<table>\n<tr><th>Severity</th><th>Finding</th><th>Remediation</th></tr>\n");
        for finding in findings {
            let class = format!("{:?}", finding.severity).to_lowercase();
            let (title, remediation) = match get_finding_detail(&finding.code) {
                Some(detail) => (detail.title, detail.remediation),
                None => (finding.code.as_str(), ""),
            };
            let _ = writeln!(
                html,
                "<tr><td class=\"{class}\">{:?}</td><td>{}</td><td>{}</td></tr>",
                finding.severity,
                html_escape(title),
                html_escape(remediation)
            );
        }
        html.push_str("</table>\n");
    }

    if let Some(ports) = report.ports.value() {
        let _ = writeln!(html, "<h2>Ports ({})</h2>\n<p>Scanned {} ports.</p>", html_escape(&ports.backend), ports.ports_scanned.len());
        push_list(&mut html, ports.open_ports.iter().map(u16::to_string));
    }
    if let Some(subdomains) = report.subdomains.value() {
        let _ = writeln!(html, "<h2>Subdomains ({})</h2>", subdomains.discovered.len());
        push_list(&mut html, subdomains.discovered.iter().cloned());
    }
    if let Some(tls) = report.tls.value() {
        let _ = writeln!(
            html,
            "<h2>TLS</h2>\n<p>Subject: {}<br>Issuer: {}<br>Valid to: {} ({} days)</p>",
            html_escape(&tls.subject),
            html_escape(&tls.issuer),
            tls.valid_to.format("%Y-%m-%d"),
            tls.days_until_expiry
        );
    }
    if let Some(headers) = report.headers.value() {
        let _ = writeln!(html, "<h2>Headers: {} ({}/100)</h2>", html_escape(&headers.grade), headers.score);
        push_list(
            &mut html,
            headers
                .findings
                .iter()
                .map(|f| format!("{}: {}", f.header, if f.present { "present" } else { "missing" })),
        );
    }
    if let Some(fingerprint) = report.fingerprint.value() {
        html.push_str("<h2>Technologies</h2>\n");
        push_list(
            &mut html,
            fingerprint.technologies.iter().map(|t| match &t.version {
                Some(version) => format!("{} {} ({})", t.name, version, t.category),
                None => format!("{} ({})", t.name, t.category),
            }),
        );
    }
    if let Some(takeover) = report.takeover.value() {
        let _ = writeln!(html, "<h2>Takeover candidates ({} checked)</h2>", takeover.checked_count);
        push_list(
            &mut html,
            takeover.flagged.iter().map(|f| format!("{}: {}", f.subdomain, f.vendor)),
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_list(html: &mut String, items: impl Iterator<Item = String>) {
    html.push_str("<ul>\n");
    for item in items {
        let _ = writeln!(html, "<li>{}</li>", html_escape(&item));
    }
    html.push_str("</ul>\n");
}

fn slot_reason(report: &ScanReport, kind: CheckKind) -> Option<&str> {
    fn reason<T>(slot: &Slot<T>) -> Option<&str> {
        match slot {
            Slot::Skipped { reason } | Slot::Failed { reason } => Some(reason.as_str()),
            _ => None,
        }
    }
    match kind {
        CheckKind::Subdomains => reason(&report.subdomains),
        CheckKind::Ports => reason(&report.ports),
        CheckKind::Tls => reason(&report.tls),
        CheckKind::Headers => reason(&report.headers),
        CheckKind::Dns => reason(&report.dns),
        CheckKind::Preview => reason(&report.preview),
        CheckKind::Takeover => reason(&report.takeover),
        CheckKind::Cors => reason(&report.cors),
        CheckKind::Cookies => reason(&report.cookies),
        CheckKind::Fingerprint => reason(&report.fingerprint),
        CheckKind::SecurityTxt => reason(&report.security_txt),
        CheckKind::MixedContent => reason(&report.mixed_content),
        CheckKind::DnsExtras => reason(&report.dns_extras),
        CheckKind::Axfr => reason(&report.axfr),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{HeadersAssessment, SubdomainReport};
    use crate::core::target::Target;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn empty_report() -> ScanReport {
        let now = Utc::now();
        ScanReport {
            target: Target::parse("example.com").unwrap(),
            started_at: now,
            finished_at: now,
            subdomains: Slot::Disabled,
            ports: Slot::Disabled,
            tls: Slot::Failed { reason: "connection refused".to_string() },
            headers: Slot::Disabled,
            dns: Slot::Disabled,
            preview: Slot::Disabled,
            takeover: Slot::Skipped { reason: "subdomain enumeration is disabled".to_string() },
            cors: Slot::Disabled,
            cookies: Slot::Disabled,
            fingerprint: Slot::Disabled,
            security_txt: Slot::Disabled,
            mixed_content: Slot::Disabled,
            dns_extras: Slot::Disabled,
            axfr: Slot::Disabled,
        }
    }

    #[test]
    fn score_subtracts_fifteen_per_critical_and_five_per_warning() {
        let critical = AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING");
        let warning = AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING");
        let info = AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING");
        let summary = ScanSummary::from_findings(&[&critical, &warning, &warning, &info]);
        assert_eq!(summary.score, 75);
        assert_eq!(summary.critical_issues, 1);
        assert_eq!(summary.warning_issues, 2);
        assert_eq!(summary.rating(), "Good");
    }

    #[test]
    fn score_is_floored_at_zero() {
        let critical = AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED");
        let findings: Vec<&AnalysisFinding> = std::iter::repeat_n(&critical, 8).collect();
        assert_eq!(ScanSummary::from_findings(&findings).score, 0);
    }

    #[test]
    fn html_escapes_report_values() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & 'b'"), "a &amp; &#39;b&#39;");

        let mut report = empty_report();
        report.subdomains = Slot::Completed {
            result: SubdomainReport {
                root_domain: "example.com".to_string(),
                discovered: vec!["<img>.example.com".to_string()],
                source_counts: BTreeMap::new(),
            },
        };
        let html = render_html(&report);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;img&gt;.example.com"));
        assert!(!html.contains("<img>"));
        assert!(html.contains("connection refused"));
    }

    #[test]
    fn console_summary_lists_every_check_and_finding() {
        let mut report = empty_report();
        report.headers = Slot::Completed {
            result: HeadersAssessment {
                url: "https://example.com".to_string(),
                findings: Vec::new(),
                grade: "F".to_string(),
                score: 0,
                analysis: vec![AnalysisFinding::new(Severity::Warning, "HEADERS_CSP_MISSING")],
            },
        };
        let text = render_console(&report);
        assert!(text.contains("Overall score: 95/100"));
        assert!(text.contains("security_txt"));
        assert!(text.contains("CSP Header Missing"));
        assert!(text.contains("Headers grade: F"));
    }

    #[test]
    fn single_slot_json_carries_its_status() {
        let report = empty_report();
        let tls: serde_json::Value = serde_json::from_str(&slot_to_json(&report, CheckKind::Tls).unwrap()).unwrap();
        assert_eq!(tls["status"], "failed");
        assert_eq!(tls["reason"], "connection refused");
        assert_eq!(report.slot_status(CheckKind::Tls), "failed");

        let dir = std::env::temp_dir().join(format!("sentinelscope-slot-{}", std::process::id()));
        let path = dir.join("nested").join("cors.json");
        write_slot_json(&report, CheckKind::Cors, &path).unwrap();
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["status"], "disabled");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn json_keeps_absent_slots_distinguishable() {
        let value: serde_json::Value = serde_json::from_str(&to_json(&empty_report()).unwrap()).unwrap();
        assert_eq!(value["ports"]["status"], "disabled");
        assert_eq!(value["tls"]["status"], "failed");
        assert_eq!(value["takeover"]["status"], "skipped");
        assert_eq!(value["target"]["host"], "example.com");
    }
}
