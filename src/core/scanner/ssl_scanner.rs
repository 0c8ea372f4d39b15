// src/core/scanner/ssl_scanner.rs

use std::net::{IpAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{AnalysisFinding, CheckKind, Severity, TlsInfo};
use crate::core::scanner::BlockingProbe;
use crate::core::target::Target;

const EXPIRY_WARNING_DAYS: i64 = 30;

/// Certificate introspection over a blocking TLS handshake. Verification is
/// disabled so that expired or mismatched certificates can still be reported.
#[derive(Debug, Clone, Copy)]
pub struct TlsProbe {
    port: u16,
}

impl Default for TlsProbe {
    fn default() -> Self {
        Self { port: 443 }
    }
}

impl TlsProbe {
    pub fn on_port(port: u16) -> Self {
        Self { port }
    }
}

impl BlockingProbe for TlsProbe {
    type Output = TlsInfo;

    fn kind(&self) -> CheckKind {
        CheckKind::Tls
    }

    fn probe_blocking(&self, target: &Target, timeout: Duration) -> ProbeResult<TlsInfo> {
        let host = target.host();
        info!(target = host, port = self.port, "Starting SSL/TLS scan.");
        let cert_der = fetch_peer_certificate(host, self.port, timeout)?;
        let info = certificate_info(host, self.port, &cert_der, Utc::now())?;
        info!(findings = %info.analysis.len(), days_left = info.days_until_expiry, "SSL/TLS scan finished.");
        Ok(info)
    }
}

fn fetch_peer_certificate(host: &str, port: u16, timeout: Duration) -> ProbeResult<Vec<u8>> {
    debug!(host, port, "Performing TLS connection and handshake.");
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to create TlsConnector");
            ProbeError::Tls(e.to_string())
        })?;

    let stream = connect_any(host, port, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let stream = connector.connect(host, stream).map_err(|e| {
        debug!(error = %e, "TLS handshake failed");
        ProbeError::Tls(format!("handshake failed: {e}"))
    })?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| ProbeError::Tls(e.to_string()))?
        .ok_or_else(|| ProbeError::Tls("server presented no certificate".to_string()))?;
    cert.to_der().map_err(|e| ProbeError::Tls(e.to_string()))
}

/// Connects to the first resolved address that accepts within `timeout`.
fn connect_any(host: &str, port: u16, timeout: Duration) -> ProbeResult<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connection failed");
                last_error = Some(e);
            }
        }
    }
    Err(match last_error {
        Some(e) => ProbeError::Io(e),
        None => ProbeError::Tls(format!("{host} resolved to no addresses")),
    })
}

/// Parses a DER certificate into the report model, evaluated at `now`.
pub fn certificate_info(host: &str, port: u16, cert_der: &[u8], now: DateTime<Utc>) -> ProbeResult<TlsInfo> {
    let (_, x509) = parse_x509_certificate(cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        ProbeError::Tls(format!("X.509 parse error: {e}"))
    })?;
    debug!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let common_name = x509
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    let subject_alternative_names: Vec<String> = x509
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let validity = x509.validity();
    let valid_from = asn1_time_to_chrono_utc(&validity.not_before);
    let valid_to = asn1_time_to_chrono_utc(&validity.not_after);
    let window = evaluate_validity(valid_from, valid_to, now);

    let mut warnings = window.warnings;
    let mut analysis = window.analysis;
    if host.parse::<IpAddr>().is_err() {
        let names: Vec<&str> = subject_alternative_names
            .iter()
            .map(String::as_str)
            .chain(common_name.as_deref())
            .collect();
        if !names.iter().any(|pattern| name_matches(pattern, host)) {
            warnings.push(format!("Certificate does not cover {host}"));
            analysis.push(AnalysisFinding::new(Severity::Warning, "SSL_HOSTNAME_MISMATCH"));
        }
    }

    Ok(TlsInfo {
        domain: host.to_string(),
        port,
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        common_name,
        subject_alternative_names,
        valid_from,
        valid_to,
        days_until_expiry: window.days_until_expiry,
        is_valid: window.is_valid,
        warnings,
        analysis,
    })
}

pub struct ValidityWindow {
    pub days_until_expiry: i64,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

pub fn evaluate_validity(not_before: DateTime<Utc>, not_after: DateTime<Utc>, now: DateTime<Utc>) -> ValidityWindow {
    let days_until_expiry = not_after.signed_duration_since(now).num_days();
    let is_valid = now > not_before && now < not_after;
    let mut warnings = Vec::new();
    let mut analysis = Vec::new();

    if !is_valid {
        debug!(expiry_date = %not_after, "Certificate is outside its validity window.");
        warnings.push("Certificate is not currently valid".to_string());
        analysis.push(AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED"));
    }
    if days_until_expiry < EXPIRY_WARNING_DAYS {
        warnings.push(format!("Certificate expiring within {EXPIRY_WARNING_DAYS} days"));
    }
    if (0..=EXPIRY_WARNING_DAYS).contains(&days_until_expiry) && is_valid {
        debug!(days_left = days_until_expiry, "Certificate is expiring soon.");
        analysis.push(AnalysisFinding::new(Severity::Warning, "SSL_EXPIRING_SOON"));
    }

    ValidityWindow { days_until_expiry, is_valid, warnings, analysis }
}

/// Hostname match against a certificate name. A leading `*.` covers exactly
/// one label.
fn name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
        None => pattern == host,
    }
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
