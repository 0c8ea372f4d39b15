// src/core/scanner/dns_scanner.rs

use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::system_conf::read_system_conf;
use tracing::{debug, info, warn};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{AnalysisFinding, CheckKind, DnsAssessment, DnsExtras, Severity};
use crate::core::scanner::Probe;
use crate::core::target::Target;

type LookupOutcome = Result<Vec<String>, ResolveError>;

/// A resolver using the system configuration, with `timeout` per query and a
/// single attempt. Falls back to the library's default nameservers when the
/// system configuration cannot be read.
pub(crate) fn build_resolver(timeout: Duration) -> TokioAsyncResolver {
    let (config, mut opts) = resolver_config();
    opts.timeout = timeout;
    opts.attempts = 1;
    TokioAsyncResolver::tokio(config, opts)
}

fn resolver_config() -> (ResolverConfig, ResolverOpts) {
    read_system_conf().unwrap_or_else(|e| {
        debug!(error = %e, "System resolver configuration unavailable, using defaults.");
        (ResolverConfig::default(), ResolverOpts::default())
    })
}

/// Mail and address records of the target, with SPF and DMARC analysis.
#[derive(Debug, Default)]
pub struct DnsProbe;

impl Probe for DnsProbe {
    type Output = DnsAssessment;

    fn kind(&self) -> CheckKind {
        CheckKind::Dns
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<DnsAssessment> {
        run_dns_scan(target.host(), timeout).await
    }
}

/// Runs the record lookups concurrently and analyses the answers.
///
/// Lookups that fail are treated as empty as long as at least one lookup got
/// an answer. When every lookup fails the scan fails.
pub async fn run_dns_scan(domain: &str, timeout: Duration) -> ProbeResult<DnsAssessment> {
    info!(target = %domain, "Starting DNS scan.");
    let resolver = build_resolver(timeout);
    let dmarc_name = format!("_dmarc.{domain}");

    let (a, aaaa, mx, txt, dmarc) = tokio::join!(
        lookup_records(&resolver, domain, RecordType::A),
        lookup_records(&resolver, domain, RecordType::AAAA),
        lookup_records(&resolver, domain, RecordType::MX),
        lookup_txt(&resolver, domain),
        lookup_txt(&resolver, &dmarc_name),
    );
    let [a, aaaa, mx, txt, dmarc] = settle([a, aaaa, mx, txt, dmarc])?;

    debug!("All DNS lookups completed, starting analysis.");
    let assessment = assess_records(domain, a, aaaa, mx, txt, &dmarc);
    info!(findings = %assessment.analysis.len(), "DNS scan finished.");
    Ok(assessment)
}

/// Builds the assessment from raw answers. `dmarc_txt` holds the TXT records
/// found at `_dmarc.<domain>`.
pub fn assess_records(
    domain: &str,
    a_records: Vec<String>,
    aaaa_records: Vec<String>,
    mx_records: Vec<String>,
    txt_records: Vec<String>,
    dmarc_txt: &[String],
) -> DnsAssessment {
    let mut assessment = DnsAssessment {
        domain: domain.to_string(),
        a_records,
        aaaa_records,
        mx_records,
        ..Default::default()
    };

    if let Some(spf) = txt_records.iter().find(|v| v.to_ascii_lowercase().starts_with("v=spf1")) {
        assessment.spf_present = true;
        assessment.spf_policy = spf_policy(spf);
        if matches!(assessment.spf_policy.as_deref(), None | Some("?all") | Some("+all")) {
            assessment.spf_recommendation = Some("Tighten SPF policy to -all or ~all".to_string());
        }
    }

    if let Some(dmarc) = dmarc_txt.iter().find(|v| v.to_ascii_lowercase().starts_with("v=dmarc1")) {
        assessment.dmarc_present = true;
        assessment.dmarc_policy = dmarc_policy(dmarc);
        if matches!(assessment.dmarc_policy.as_deref(), None | Some("none")) {
            assessment.dmarc_recommendation = Some("Set DMARC policy to quarantine or reject".to_string());
        }
    }

    assessment.txt_records = txt_records;
    assessment.analysis = analyze_dns(&assessment);
    assessment
}

/// The `all` qualifier of an SPF record, strictest first.
pub fn spf_policy(record: &str) -> Option<String> {
    ["-all", "~all", "?all", "+all"]
        .into_iter()
        .find(|policy| record.contains(policy))
        .map(str::to_string)
}

/// The `p=` tag of a DMARC record, lowercased.
pub fn dmarc_policy(record: &str) -> Option<String> {
    record
        .split(';')
        .map(|tag| tag.trim().to_ascii_lowercase())
        .find_map(|tag| tag.strip_prefix("p=").map(str::to_string))
}

fn analyze_dns(assessment: &DnsAssessment) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();

    if !assessment.dmarc_present {
        debug!("DMARC analysis: No record found, adding Critical finding.");
        analyses.push(AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING"));
    } else if assessment.dmarc_recommendation.is_some() {
        analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"));
    }

    if !assessment.spf_present {
        debug!("SPF analysis: No record found, adding Warning finding.");
        analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING"));
    } else if assessment.spf_recommendation.is_some() {
        analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_POLICY_WEAK"));
    } else if assessment.spf_policy.as_deref() == Some("~all") {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_SOFTFAIL"));
    }

    analyses
}

/// DNSSEC presence and CAA records of the target.
#[derive(Debug, Default)]
pub struct DnsExtrasProbe;

impl Probe for DnsExtrasProbe {
    type Output = DnsExtras;

    fn kind(&self) -> CheckKind {
        CheckKind::DnsExtras
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<DnsExtras> {
        let domain = target.host();
        info!(target = %domain, "Starting DNS extras scan.");
        let resolver = build_resolver(timeout);

        let (dnskey, caa) = tokio::join!(
            lookup_records(&resolver, domain, RecordType::DNSKEY),
            lookup_records(&resolver, domain, RecordType::CAA),
        );
        let [dnskey, caa_records] = settle([dnskey, caa])?;

        let mut analysis = Vec::new();
        if caa_records.is_empty() {
            analysis.push(AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"));
        }
        if dnskey.is_empty() {
            analysis.push(AnalysisFinding::new(Severity::Info, "DNS_DNSSEC_MISSING"));
        }
        Ok(DnsExtras {
            domain: domain.to_string(),
            dnssec_present: !dnskey.is_empty(),
            caa_records,
            analysis,
        })
    }
}

/// Fails only when every lookup failed; otherwise failed lookups read as empty.
fn settle<const N: usize>(lookups: [LookupOutcome; N]) -> ProbeResult<[Vec<String>; N]> {
    if lookups.iter().all(Result::is_err) {
        return Err(lookups
            .into_iter()
            .find_map(Result::err)
            .map(ProbeError::from)
            .unwrap_or_else(|| ProbeError::Malformed("no DNS lookups were made".to_string())));
    }
    Ok(lookups.map(Result::unwrap_or_default))
}

/// An existing name without records of this type is an empty answer. A name
/// that does not exist, or a server that never answered, is an error.
fn empty_when_no_records(name: &str, error: ResolveError) -> LookupOutcome {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } if *response_code != ResponseCode::NXDomain => {
            debug!(name, "No records of this type.");
            Ok(Vec::new())
        }
        _ => {
            warn!(name, error = %error, "DNS lookup failed.");
            Err(error)
        }
    }
}

pub(crate) async fn lookup_records(resolver: &TokioAsyncResolver, name: &str, record_type: RecordType) -> LookupOutcome {
    debug!(name, record_type = %record_type, "Looking up records.");
    match resolver.lookup(name, record_type).await {
        Ok(lookup) => Ok(lookup
            .record_iter()
            .filter(|record| record.record_type() == record_type)
            .filter_map(|record| record.data().map(|data| data.to_string()))
            .collect()),
        Err(e) => empty_when_no_records(name, e),
    }
}

async fn lookup_txt(resolver: &TokioAsyncResolver, name: &str) -> LookupOutcome {
    debug!(name, "Looking up TXT records.");
    match resolver.txt_lookup(name).await {
        Ok(txt) => Ok(txt
            .iter()
            .map(|record| {
                record
                    .txt_data()
                    .iter()
                    .map(|part| String::from_utf8_lossy(part))
                    .collect::<String>()
            })
            .collect()),
        Err(e) => empty_when_no_records(name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn codes(assessment: &DnsAssessment) -> Vec<&str> {
        assessment.analysis.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn resolver_follows_the_system_configuration() {
        let (config, _) = resolver_config();
        match read_system_conf() {
            Ok((system, _)) => assert_eq!(config, system),
            Err(_) => assert_eq!(config, ResolverConfig::default()),
        }
    }

    #[test]
    fn strict_mail_policy_has_no_findings() {
        let assessment = assess_records(
            "example.com",
            strings(&["93.184.216.34"]),
            Vec::new(),
            strings(&["10 mail.example.com."]),
            strings(&["google-site-verification=abc", "v=spf1 include:_spf.example.com -all"]),
            &strings(&["v=DMARC1; p=reject; rua=mailto:d@example.com"]),
        );
        assert!(assessment.spf_present);
        assert_eq!(assessment.spf_policy.as_deref(), Some("-all"));
        assert_eq!(assessment.dmarc_policy.as_deref(), Some("reject"));
        assert!(assessment.spf_recommendation.is_none());
        assert!(assessment.dmarc_recommendation.is_none());
        assert!(assessment.analysis.is_empty());
        assert_eq!(assessment.txt_records.len(), 2);
    }

    #[test]
    fn missing_records_are_flagged() {
        let assessment = assess_records("example.com", Vec::new(), Vec::new(), Vec::new(), Vec::new(), &[]);
        assert!(!assessment.spf_present && !assessment.dmarc_present);
        assert_eq!(codes(&assessment), vec!["DNS_DMARC_MISSING", "DNS_SPF_MISSING"]);
    }

    #[test]
    fn weak_policies_get_recommendations() {
        let assessment = assess_records(
            "example.com",
            Vec::new(),
            Vec::new(),
            Vec::new(),
            strings(&["v=spf1 +all"]),
            &strings(&["v=DMARC1; p=none"]),
        );
        assert!(assessment.spf_recommendation.is_some());
        assert!(assessment.dmarc_recommendation.is_some());
        assert_eq!(codes(&assessment), vec!["DNS_DMARC_POLICY_NONE", "DNS_SPF_POLICY_WEAK"]);
    }

    #[test]
    fn softfail_is_informational() {
        let assessment = assess_records(
            "example.com",
            Vec::new(),
            Vec::new(),
            Vec::new(),
            strings(&["v=spf1 mx ~all"]),
            &strings(&["v=DMARC1; p=quarantine"]),
        );
        assert_eq!(codes(&assessment), vec!["DNS_SPF_POLICY_SOFTFAIL"]);
    }

    #[test]
    fn policy_parsers() {
        assert_eq!(spf_policy("v=spf1 a mx"), None);
        assert_eq!(spf_policy("v=spf1 ?all").as_deref(), Some("?all"));
        assert_eq!(dmarc_policy("v=DMARC1;P=Quarantine").as_deref(), Some("quarantine"));
        assert_eq!(dmarc_policy("v=DMARC1; sp=none"), None);
    }

    #[test]
    fn settle_keeps_partial_answers() {
        let ok: LookupOutcome = Ok(strings(&["1.2.3.4"]));
        let failed: LookupOutcome = Err(ResolveError::from("no connections available"));
        let [first, second] = settle([ok, failed]).unwrap();
        assert_eq!(first, strings(&["1.2.3.4"]));
        assert!(second.is_empty());
    }

    #[test]
    fn settle_fails_when_nothing_answered() {
        let failed = || -> LookupOutcome { Err(ResolveError::from("timed out")) };
        assert!(matches!(settle([failed(), failed()]), Err(ProbeError::Dns(_))));
    }
}
